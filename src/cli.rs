use clap::Parser;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the raw recipe text file (webpage scrape or video transcript)
    #[arg(short, long)]
    pub recipe_file: String,

    /// SQLite URL of the nutrient store
    #[arg(long, default_value = "sqlite://nutrients.db")]
    pub database_url: String,

    /// Skip image synthesis and attach a placeholder image
    #[arg(long)]
    pub skip_image: bool,
}

pub fn parse_args() -> Cli {
    Cli::parse()
}
