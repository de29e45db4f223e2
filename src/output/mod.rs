mod preview;
mod styling;
mod tables;

pub use preview::{PreviewFormat, PreviewSink};
pub use styling::{bright_green, dim, magenta_bold};

/// Prints the cctray banner to stderr.
pub fn print_banner() {
    eprintln!(
        r"
{} {}
  {}
",
        magenta_bold("cctray"),
        dim(env!("CARGO_PKG_VERSION")),
        dim("Pipeline status feed publisher")
    );
}
