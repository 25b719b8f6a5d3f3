use image::Rgba;

pub const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

const NAMED: &[(&str, [u8; 4])] = &[
    ("black", [0, 0, 0, 255]),
    ("white", [255, 255, 255, 255]),
    ("red", [255, 0, 0, 255]),
    ("green", [0, 128, 0, 255]),
    ("lime", [0, 255, 0, 255]),
    ("blue", [0, 0, 255, 255]),
    ("yellow", [255, 255, 0, 255]),
    ("cyan", [0, 255, 255, 255]),
    ("aqua", [0, 255, 255, 255]),
    ("magenta", [255, 0, 255, 255]),
    ("fuchsia", [255, 0, 255, 255]),
    ("gray", [128, 128, 128, 255]),
    ("grey", [128, 128, 128, 255]),
    ("orange", [255, 165, 0, 255]),
    ("purple", [128, 0, 128, 255]),
    ("brown", [165, 42, 42, 255]),
    ("pink", [255, 192, 203, 255]),
    ("transparent", [0, 0, 0, 0]),
];

/// Parses the CSS color forms a color input or peer is likely to send.
pub fn parse_css_color(value: &str) -> Option<Rgba<u8>> {
    let value = value.trim();
    if let Some(hex) = value.strip_prefix('#') {
        return parse_hex(hex);
    }
    let lower = value.to_ascii_lowercase();
    if let Some(args) = lower
        .strip_prefix("rgba(")
        .or_else(|| lower.strip_prefix("rgb("))
    {
        return parse_rgb_args(args.strip_suffix(')')?);
    }
    NAMED
        .iter()
        .find(|(name, _)| *name == lower)
        .map(|(_, rgba)| Rgba(*rgba))
}

fn parse_hex(hex: &str) -> Option<Rgba<u8>> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let nibble = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|v| v * 17);
    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    match hex.len() {
        3 => Some(Rgba([nibble(0)?, nibble(1)?, nibble(2)?, 255])),
        4 => Some(Rgba([nibble(0)?, nibble(1)?, nibble(2)?, nibble(3)?])),
        6 => Some(Rgba([byte(0)?, byte(2)?, byte(4)?, 255])),
        8 => Some(Rgba([byte(0)?, byte(2)?, byte(4)?, byte(6)?])),
        _ => None,
    }
}

fn parse_rgb_args(args: &str) -> Option<Rgba<u8>> {
    let parts = args.split(',').map(str::trim).collect::<Vec<_>>();
    if parts.len() != 3 && parts.len() != 4 {
        return None;
    }
    let channel = |part: &str| -> Option<u8> {
        let value = part.parse::<f32>().ok()?;
        Some(value.clamp(0.0, 255.0).round() as u8)
    };
    let alpha = match parts.get(3) {
        Some(part) => {
            let value = part.parse::<f32>().ok()?;
            (value.clamp(0.0, 1.0) * 255.0).round() as u8
        }
        None => 255,
    };
    Some(Rgba([
        channel(parts[0])?,
        channel(parts[1])?,
        channel(parts[2])?,
        alpha,
    ]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_forms() {
        assert_eq!(parse_css_color("#000"), Some(BLACK));
        assert_eq!(parse_css_color("#ff8000"), Some(Rgba([255, 128, 0, 255])));
        assert_eq!(parse_css_color("#ff800080"), Some(Rgba([255, 128, 0, 128])));
        assert_eq!(parse_css_color("#fff8"), Some(Rgba([255, 255, 255, 136])));
        assert_eq!(parse_css_color("#12"), None);
        assert_eq!(parse_css_color("#zzzzzz"), None);
    }

    #[test]
    fn parses_functional_and_named_forms() {
        assert_eq!(parse_css_color("rgb(1, 2, 3)"), Some(Rgba([1, 2, 3, 255])));
        assert_eq!(
            parse_css_color("RGBA(10,20,30,0.5)"),
            Some(Rgba([10, 20, 30, 128]))
        );
        assert_eq!(parse_css_color("White"), Some(Rgba([255, 255, 255, 255])));
        assert_eq!(parse_css_color("not-a-color"), None);
    }
}
