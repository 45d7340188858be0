fn main() -> anyhow::Result<()> {
    // Host builds have no ESP-IDF to link against.
    if std::env::var_os("CARGO_FEATURE_ESP32").is_some() {
        embuild::build::CfgArgs::output_propagated("ESP_IDF")?;
        embuild::build::LinkArgs::output_propagated("ESP_IDF")?;
    }
    Ok(())
}
