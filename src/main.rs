#[cfg(not(target_arch = "wasm32"))]
fn main() -> anyhow::Result<()> {
    use anyhow::Context as _;
    use compute_viewer::ViewerConfig;

    env_logger::init();

    // optional first argument: path to a JSON viewer config
    let config = match std::env::args().nth(1) {
        Some(path) => {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("reading config {path}"))?;
            ViewerConfig::from_json_str(&text)?
        }
        None => ViewerConfig::default(),
    };
    log::info!("solving {} via {}", config.definition, config.endpoint);

    compute_viewer::run_native(config).map_err(|e| anyhow::anyhow!("viewer exited: {e}"))
}

// The browser build starts from `compute_viewer::start`.
#[cfg(target_arch = "wasm32")]
fn main() {}
