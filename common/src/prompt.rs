use crate::types::SensorReading;

const PREAMBLE: &str = "You are a home weather assistant.";
const BASE_INSTRUCTION: &str = "Write ONE friendly sentence describing the indoor conditions.";
const COMPARE_INSTRUCTION: &str = "Compare the indoor temperature with the outside temperature.";
const STYLE_INSTRUCTION: &str = "Avoid emojis. Be concise. Sound human.";

/// Renders the instruction sent to the language model.
///
/// Output is a pure function of `reading`. Each optional line is gated only by
/// its own field.
pub fn build_prompt(reading: &SensorReading) -> String {
    let mut lines = vec![
        PREAMBLE.to_string(),
        String::new(),
        format!("Inside temperature: {}°C", format_value(reading.temperature_c())),
        format!("Humidity: {}%", format_value(reading.humidity())),
    ];
    if let Some(outside_temp_c) = reading.outside_temp_c() {
        lines.push(format!(
            "Outside temperature: {}°C",
            format_value(outside_temp_c)
        ));
    }

    lines.push(String::new());
    lines.push(BASE_INSTRUCTION.to_string());
    if reading.outside_temp_c().is_some() {
        lines.push(COMPARE_INSTRUCTION.to_string());
    }
    if let Some(outside_humidity) = reading.outside_humidity() {
        lines.push(format!(
            "Mention that the outside humidity is {}%.",
            format_value(outside_humidity)
        ));
    }
    lines.push(STYLE_INSTRUCTION.to_string());

    lines.join("\n")
}

// Shortest round-trip form, always with a fractional digit.
fn format_value(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}
