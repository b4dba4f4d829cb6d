fn main() -> std::process::ExitCode {
    vitals_triage::run()
}
