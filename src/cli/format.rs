//! Format output dispatch helpers

/// Dispatch on output format; the json branch returns a `Result`,
/// the human branch prints and yields `()`.
///
/// ```rust,ignore
/// output_by_format_result!(ctx.cli.format,
///     json => print_json(&value),
///     human => { println!("..."); }
/// )
/// ```
#[macro_export]
macro_rules! output_by_format_result {
    ($format:expr, json => $json:expr, human => $human:block) => {
        match $format {
            $crate::cli::OutputFormat::Json => $json,
            $crate::cli::OutputFormat::Human => {
                $human;
                Ok(())
            }
        }
    };
}
