use crate::CLAP_STYLING;
use clap::{arg, command};

fn crawl_args(cmd: clap::Command) -> clap::Command {
    cmd.arg(
        arg!(-u --"url" <URL>)
            .required(true)
            .help("The seed URL to crawl from (https:// is assumed when no scheme is given)"),
    )
    .arg(
        arg!(-p --"path-scope" <PATH_SCOPE>)
            .required(false)
            .help("Only follow URLs whose path starts with this prefix (default: entire domain)"),
    )
    .arg(
        arg!(-t --"threads" <NUM_WORKERS>)
            .required(false)
            .help("The number of pages fetched at once. 1 gives a deterministic crawl order.")
            .value_parser(clap::value_parser!(usize))
            .default_value("1"),
    )
    .arg(
        arg!(--"timeout" <SECONDS>)
            .required(false)
            .help("Per-page fetch timeout in seconds")
            .value_parser(clap::value_parser!(u64))
            .default_value("10"),
    )
}

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("sitebinder")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("sitebinder")
        .styles(CLAP_STYLING)
        .about("Crawl a site within a domain and path scope, then index it or bind it into one PDF")
        .arg(arg!(-q --"quiet" "Suppress banner and non-essential output").required(false))
        .arg(arg!(-v --"verbose" "Log every crawl decision (RUST_LOG overrides)").required(false))
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            crawl_args(command!("index").about("Crawl the site and write a sorted URL index file"))
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(false)
                        .help("Index file, or a directory to place it in (default: urls_<domain>_<scope>.txt)"),
                )
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(false)
                        .help("Report format: text, json")
                        .value_parser(["text", "json"])
                        .default_value("text"),
                ),
        )
        .subcommand(
            crawl_args(command!("pdf").about("Crawl the site, print every page and merge them into one PDF"))
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(false)
                        .help("Output PDF path, .pdf is appended when missing")
                        .default_value("output.pdf"),
                )
                .arg(
                    arg!(--"tabs" <NUM_TABS>)
                        .required(false)
                        .help("The number of pages printed at once")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("1"),
                ),
        )
}
