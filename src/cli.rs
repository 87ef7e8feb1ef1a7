use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "mushaf-scrape",
    version,
    about = "Mushaf Makkah web app scraping and aggregation tooling"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Scrape(ScrapeArgs),
    Status(StatusArgs),
    Validate(ValidateArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ScrapeArgs {
    #[arg(long, default_value_t = false)]
    pub headless: bool,

    #[arg(long, default_value_t = false)]
    pub log: bool,

    #[arg(long, default_value_t = 20)]
    pub log_width: usize,

    #[arg(long, default_value_t = 10.0)]
    pub query_wait: f64,

    #[arg(long, default_value_t = 10.0)]
    pub script_wait: f64,

    #[arg(long, default_value_t = 10.0)]
    pub load_wait: f64,

    #[arg(long, default_value = "data/quran_")]
    pub file_prefix: String,

    #[arg(long, default_value_t = 2)]
    pub indent: usize,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[arg(long, default_value = "data/quran_")]
    pub file_prefix: String,
}

#[derive(Args, Debug, Clone)]
pub struct ValidateArgs {
    #[arg(long, default_value = "data/quran_")]
    pub file_prefix: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scrape_defaults_match_the_documented_surface() {
        let cli = Cli::try_parse_from(["mushaf-scrape", "scrape"]).expect("parse failed");
        let Commands::Scrape(args) = cli.command else {
            panic!("expected scrape subcommand");
        };

        assert!(!args.headless);
        assert!(!args.log);
        assert_eq!(args.log_width, 20);
        assert_eq!(args.query_wait, 10.0);
        assert_eq!(args.script_wait, 10.0);
        assert_eq!(args.load_wait, 10.0);
        assert_eq!(args.file_prefix, "data/quran_");
        assert_eq!(args.indent, 2);
    }

    #[test]
    fn scrape_flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "mushaf-scrape",
            "scrape",
            "--headless",
            "--log",
            "--log-width",
            "40",
            "--query-wait",
            "2.5",
            "--file-prefix",
            "out/mushaf_",
            "--indent",
            "0",
        ])
        .expect("parse failed");
        let Commands::Scrape(args) = cli.command else {
            panic!("expected scrape subcommand");
        };

        assert!(args.headless);
        assert!(args.log);
        assert_eq!(args.log_width, 40);
        assert_eq!(args.query_wait, 2.5);
        assert_eq!(args.file_prefix, "out/mushaf_");
        assert_eq!(args.indent, 0);
    }
}
