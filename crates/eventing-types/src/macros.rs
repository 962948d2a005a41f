/// Print an error to stderr with a colored `error:` prefix
#[macro_export]
macro_rules! print_cli_err {
    ($x:expr) => {
        eprintln!("\x1B[1;31merror:\x1B[0m {}", $x);
    };
}

/// Run `$body` only if `$name` is allowed by the config's controller white list
#[macro_export]
macro_rules! whitelist {
    ($white_list:expr, $name:expr, $body:expr) => {
        if $white_list.is_empty() || $white_list.contains($name) {
            tracing::info!("starting {}", $name);
            $body;
        } else {
            tracing::info!("skipping {}", $name);
        }
    };
}
