use std::process::ExitCode;

fn main() -> ExitCode {
    qrcode_processor::cli::main()
}
