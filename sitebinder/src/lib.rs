pub mod handlers;

// Re-export commonly used handler functions for convenience
pub use handlers::{
    CrawlArgs, ReportFormat, expand_output_path, format_report, index_output_path,
    parse_seed_url, run_index,
};

// Re-export crawl functionality from sitebinder-core
pub use sitebinder_core::crawl::{
    CrawlOptions, execute_crawl, extract_url_path, generate_crawl_report,
};
