#[cfg(not(target_arch = "wasm32"))]
fn main() -> std::process::ExitCode {
    use std::process::ExitCode;

    let result = speed_toggle::app::start();
    match result {
        Ok(..) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err:?}");
            ExitCode::FAILURE
        }
    }
}

// The browser build is driven by `web::start`.
#[cfg(target_arch = "wasm32")]
fn main() {}
