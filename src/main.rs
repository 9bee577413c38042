use clap::Parser;
use finplan::api::{Cli, Command, analyze_json, ask_text, run_http_server};

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Serve { port } => {
            if let Err(e) = run_http_server(port).await {
                eprintln!("Server error: {e}");
                std::process::exit(1);
            }
            return;
        }
        Command::Analyze { profile } => analyze_json(profile),
        Command::Ask {
            question,
            show_work,
            profile,
        } => ask_text(&question, show_work, profile),
    };

    match result {
        Ok(output) => println!("{output}"),
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}
