/// Characters per line on a 128 px wide panel with a 6 px font.
pub const DISPLAY_COLS: usize = 21;
pub const DISPLAY_LINES: usize = 8;
pub const DISPLAY_TITLE: &str = "DHT11 Sensor";

/// Text content of one screen, top to bottom.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DisplayFrame {
    pub lines: Vec<String>,
}

impl DisplayFrame {
    pub fn message(text: &str) -> Self {
        Self {
            lines: vec![text.to_string()],
        }
    }

    /// Title, temperature, humidity, then as much of the description as fits.
    pub fn reading(temperature_c: f64, humidity: f64, description: Option<&str>) -> Self {
        let mut lines = vec![
            DISPLAY_TITLE.to_string(),
            format!("Temp: {temperature_c:.1}C"),
            format!("Humid: {humidity:.0}%"),
        ];
        if let Some(description) = description {
            let room = DISPLAY_LINES.saturating_sub(lines.len());
            lines.extend(wrap_text(description, DISPLAY_COLS).into_iter().take(room));
        }
        Self { lines }
    }
}

/// Greedy word wrap; words longer than `cols` are split hard.
pub fn wrap_text(text: &str, cols: usize) -> Vec<String> {
    let cols = cols.max(1);
    let mut lines: Vec<String> = Vec::new();
    for word in text.split_whitespace() {
        match lines.last_mut() {
            Some(last) if last.chars().count() + 1 + word.chars().count() <= cols => {
                last.push(' ');
                last.push_str(word);
            }
            _ => lines.push(word.to_string()),
        }
    }

    let mut out = Vec::with_capacity(lines.len());
    for line in lines {
        let mut rest: Vec<char> = line.chars().collect();
        while rest.len() > cols {
            let tail = rest.split_off(cols);
            out.push(rest.into_iter().collect());
            rest = tail;
            while rest.first().is_some_and(|c| c.is_whitespace()) {
                rest.remove(0);
            }
        }
        if !rest.is_empty() {
            out.push(rest.into_iter().collect());
        }
    }
    out
}
