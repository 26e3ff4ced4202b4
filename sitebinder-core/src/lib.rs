use colored::Colorize;

pub mod crawl;
pub mod error;
pub mod index;
pub mod merge;
pub mod pipeline;
pub mod render;

pub use error::{CoreError, MergeError, RenderError};

pub fn print_banner() {
    println!(
        "{}",
        r#"
     _ _       _     _           _
 ___(_) |_ ___| |__ (_)_ __   __| | ___ _ __
/ __| | __/ _ \ '_ \| | '_ \ / _` |/ _ \ '__|
\__ \ | ||  __/ |_) | | | | | (_| |  __/ |
|___/_|\__\___|_.__/|_|_| |_|\__,_|\___|_|
"#
        .bright_cyan()
    );
    println!(
        "  {} {}\n",
        "crawl a site, bind it into one PDF".bright_white(),
        format!("v{}", env!("CARGO_PKG_VERSION")).bright_black()
    );
}
