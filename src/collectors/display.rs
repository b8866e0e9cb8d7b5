use std::sync::LazyLock;

use metrix_core::{DataPoint, Metric, Timestamp};
use regex::Regex;

use crate::{collector::Collector, BoxFuture, Error};

use super::{command, pattern, ratio, MACOS};

static SCALE: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r#""Brightness_Scale"\s*=\s*(\d+)"#));
static LEVEL: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r#""IOMFBBrightnessLevel"\s*=\s*(\d+)"#));
static NAME: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r#""IONameMatched"\s*=\s*"([^"]+)""#));

const DEFAULT_SCALE: u64 = 65536;

/**
Brightness of each built-in display.

Reports nothing if no display exposes its brightness.
*/
#[derive(Default)]
pub struct Display;

impl Collector for Display {
    fn name(&self) -> &'static str {
        "display"
    }

    fn collect(&self) -> BoxFuture<'_, Result<Vec<Metric>, Error>> {
        Box::pin(async move {
            if !MACOS {
                return Ok(Vec::new());
            }

            let output =
                match command::run("ioreg", &["-r", "-c", "IOMobileFramebuffer", "-d", "3"]).await
                {
                    Ok(output) => output,
                    Err(err) => {
                        emit::debug!("display brightness is unavailable: {err}");

                        return Ok(Vec::new());
                    }
                };

            let now = Timestamp::now();

            let brightness =
                Metric::gauge("system.display.brightness", "ratio", "Screen brightness level")
                    .with_points(parse_ioreg(&output)?.into_iter().map(|display| {
                        DataPoint::new(now, display.brightness)
                            .with_attribute("display", display.name)
                    }));

            if brightness.is_empty() {
                return Ok(Vec::new());
            }

            Ok(vec![brightness])
        })
    }
}

#[derive(Debug, PartialEq)]
struct DisplayBrightness {
    name: String,
    brightness: f64,
}

/**
Parse the output of `ioreg -r -c IOMobileFramebuffer`.

Each framebuffer block lists its brightness scale and level before the name it matched.
*/
fn parse_ioreg(output: &str) -> Result<Vec<DisplayBrightness>, Error> {
    let (scale_pattern, level_pattern, name_pattern) =
        (pattern(&SCALE)?, pattern(&LEVEL)?, pattern(&NAME)?);

    let mut displays = Vec::new();

    let mut scale = DEFAULT_SCALE;
    let mut level = None;

    for line in output.lines() {
        if let Some(captures) = scale_pattern.captures(line) {
            scale = captures[1].parse().unwrap_or(DEFAULT_SCALE);
            continue;
        }

        if level.is_none() {
            if let Some(captures) = level_pattern.captures(line) {
                level = captures[1].parse::<u64>().ok();
                continue;
            }
        }

        if let Some(captures) = name_pattern.captures(line) {
            if let Some(level) = level {
                if scale > 0 {
                    displays.push(DisplayBrightness {
                        name: captures[1].to_owned(),
                        brightness: ratio(level as f64, scale as f64 * 100.0),
                    });
                }
            }

            scale = DEFAULT_SCALE;
            level = None;
        }
    }

    Ok(displays)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_ioreg_displays() {
        let output = r#"+-o AppleCLCD2  <class AppleCLCD2, id 0x10000076b, registered, matched, active, busy 0 (0 ms), retain 13>
    {
      "Brightness_Scale" = 65536
      "IOMFBBrightnessLevel" = 3276800
      "IONameMatched" = "disp0,t600x"
    }
+-o IOMobileFramebufferShim  <class IOMobileFramebufferShim, id 0x100000800>
    {
      "IONameMatched" = "dispext0,t600x"
    }
"#;

        assert_eq!(
            vec![DisplayBrightness {
                name: "disp0,t600x".into(),
                brightness: 0.5,
            }],
            parse_ioreg(output).unwrap()
        );
    }

    #[test]
    fn parse_ioreg_clamps_brightness() {
        let output = r#""Brightness_Scale" = 1
"IOMFBBrightnessLevel" = 500
"IONameMatched" = "disp0"
"#;

        assert_eq!(1.0, parse_ioreg(output).unwrap()[0].brightness);
    }

    #[test]
    fn parse_ioreg_huge_scale() {
        let output = r#""Brightness_Scale" = 18446744073709551615
"IOMFBBrightnessLevel" = 500
"IONameMatched" = "disp0"
"#;

        let displays = parse_ioreg(output).unwrap();

        assert_eq!("disp0", displays[0].name);
        assert!(displays[0].brightness < 1e-12);
    }

    #[test]
    fn parse_ioreg_empty() {
        assert!(parse_ioreg("").unwrap().is_empty());
    }
}
