use pantry_core::config::{AppConfig, LoadOptions};

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];

    lines.push(render_line("llm.provider", &format!("{:?}", config.llm.provider)));
    lines.push(render_line("llm.model", &config.llm.model));
    lines.push(render_line(
        "llm.api_key",
        if config.llm.api_key.is_some() { "<redacted>" } else { "<unset>" },
    ));
    lines.push(render_line("llm.timeout_secs", &config.llm.timeout_secs.to_string()));

    lines.push(render_line(
        "pipeline.budget_ceiling",
        &config.pipeline.budget_ceiling.to_string(),
    ));
    lines.push(render_line(
        "pipeline.default_item_price",
        &config.pipeline.default_item_price.to_string(),
    ));
    lines.push(render_line("pipeline.max_attempts", &config.pipeline.max_attempts.to_string()));
    lines.push(render_line(
        "pipeline.reference_dir",
        &config
            .pipeline
            .reference_dir
            .as_deref()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "<unset>".to_string()),
    ));

    lines.push(render_line("logging.level", &config.logging.level));
    lines.push(render_line("logging.format", &format!("{:?}", config.logging.format)));

    lines.join("\n")
}

fn render_line(key: &str, value: &str) -> String {
    format!("- {key} = {value}")
}
