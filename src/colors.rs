use colored::CustomColor;
use std::sync::LazyLock;

pub static TERMINAL_THEME: LazyLock<termbg::Theme> = LazyLock::new(|| {
    termbg::theme(std::time::Duration::from_millis(10)).unwrap_or(termbg::Theme::Dark)
});

pub static CALL_COLOR: LazyLock<CustomColor> =
    LazyLock::new(|| from_terminal_theme((0, 0, 140), (0, 169, 233)));
pub static ERRNO_COLOR: LazyLock<CustomColor> =
    LazyLock::new(|| from_terminal_theme((160, 30, 30), (230, 90, 90)));
pub static GENERAL_TEXT_COLOR: LazyLock<CustomColor> =
    LazyLock::new(|| from_terminal_theme((64, 64, 64), (160, 160, 160)));
pub static FOOTNOTE_COLOR: LazyLock<CustomColor> =
    LazyLock::new(|| from_terminal_theme((112, 127, 35), (187, 142, 35)));

fn from_terminal_theme(
    (light_r, light_g, light_b): (u8, u8, u8),
    (dark_r, dark_g, dark_b): (u8, u8, u8),
) -> CustomColor {
    match *TERMINAL_THEME {
        termbg::Theme::Light => CustomColor::new(light_r, light_g, light_b),
        termbg::Theme::Dark => CustomColor::new(dark_r, dark_g, dark_b),
    }
}
