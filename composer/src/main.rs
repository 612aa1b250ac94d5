use sqlcomposer::core::ComposerApp;

fn main() {
    if let Err(e) = ComposerApp::run() {
        eprintln!("\nError: {:#}\n", e);
        std::process::exit(1);
    }
}
