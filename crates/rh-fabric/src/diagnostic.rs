use colored::Colorize;

/// Print a fatal diagnostic for the operator on stderr.
///
/// Used by whichever component hits a fatal error, right before it escalates
/// through its error channel or the quit switch.
pub fn print_fatal(message: impl std::fmt::Display) {
    eprintln!("{} {message}", " ERROR ".white().on_red().bold());
}
