//! Printed connectivity banners.  Printed raw, without the poem footer.

use chrono::{DateTime, Local};

use crate::config::{ApModeConfig, ShutterConfig};
use crate::generate::truncate_diagnostic;
use crate::pipeline::DeviceState;

fn stamp(at: DateTime<Local>) -> String {
    at.format("%B %d, %Y %H:%M").to_string()
}

fn setup_guidance(ap: &ApModeConfig, shutter: &ShutterConfig) -> String {
    format!(
        "to fix me, hold the shutter for {}s,\n\
         join the {} wifi network\n\
         and open {}",
        shutter.hold_min_ms.div_ceil(1_000),
        ap.profile,
        ap.dashboard_url
    )
}

/// Printed once when reachability is lost.
pub fn offline_banner(
    at: DateTime<Local>,
    diagnostic: &str,
    max_chars: usize,
    device: DeviceState,
    ap: &ApModeConfig,
    shutter: &ShutterConfig,
) -> String {
    let (diag, cut) = truncate_diagnostic(diagnostic, max_chars);
    let ellipsis = if cut { "..." } else { "" };
    format!(
        "\n{}\ni am OFFLINE!\n(Error: {diag}{ellipsis})\ncamera: {}\n{}\n\n\n",
        stamp(at),
        device.label(),
        setup_guidance(ap, shutter)
    )
}

/// Printed once when reachability comes back.
pub fn online_banner(at: DateTime<Local>) -> String {
    format!("\n{}\ni am back ONLINE!\n\n\n", stamp(at))
}

/// Printed after the first poll when the startup greeting is enabled.
pub fn startup_banner(online: bool, ap: &ApModeConfig, shutter: &ShutterConfig) -> String {
    if online {
        "\nhello, i am\npoetry camera\nand i am ONLINE!\n\n\n".to_string()
    } else {
        format!(
            "\nhello, i am\npoetry camera\nbut i'm OFFLINE!\ni need internet to work!\n{}\n\n\n",
            setup_guidance(ap, shutter)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 0).unwrap()
    }

    #[test]
    fn offline_banner_has_time_diagnostic_and_guidance() {
        let text = offline_banner(
            at(),
            "www.google.com: timed out after 5s",
            50,
            DeviceState::Idle,
            &ApModeConfig::default(),
            &ShutterConfig::default(),
        );
        assert!(text.contains("March 09, 2024 14:05"));
        assert!(text.contains("(Error: www.google.com: timed out after 5s)"));
        assert!(text.contains("camera: Idle"));
        assert!(text.contains("hold the shutter for 9s"));
        assert!(text.contains("PoetCam"));
        assert!(text.contains("http://10.42.0.1:8000"));
    }

    #[test]
    fn offline_diagnostic_is_truncated() {
        let text = offline_banner(
            at(),
            &"e".repeat(200),
            10,
            DeviceState::Composing,
            &ApModeConfig::default(),
            &ShutterConfig::default(),
        );
        assert!(text.contains(&format!("(Error: {}...)", "e".repeat(10))));
        assert!(text.contains("camera: Composing"));
    }

    #[test]
    fn startup_greetings() {
        let ap = ApModeConfig::default();
        let shutter = ShutterConfig::default();
        assert!(startup_banner(true, &ap, &shutter).contains("and i am ONLINE!"));
        let offline = startup_banner(false, &ap, &shutter);
        assert!(offline.contains("but i'm OFFLINE!"));
        assert!(offline.contains("join the PoetCam wifi network"));
    }

    #[test]
    fn online_banner_is_short() {
        assert_eq!(online_banner(at()), "\nMarch 09, 2024 14:05\ni am back ONLINE!\n\n\n");
    }
}
