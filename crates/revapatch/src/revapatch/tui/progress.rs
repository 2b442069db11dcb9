use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use once_cell::sync::Lazy;
use std::borrow::Cow;
use std::time::Duration;

pub static GLOBAL_MP: Lazy<MultiProgress> = Lazy::new(MultiProgress::new);

pub fn create_spinner(message: impl Into<Cow<'static, str>>) -> ProgressBar {
    let pb = GLOBAL_MP.add(ProgressBar::new_spinner());
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_strings(&["◜", "◠", "◝", "◞", "◡", "◟", "✔"])
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

pub fn create_bytes_progress(message: impl Into<Cow<'static, str>>, total: u64) -> ProgressBar {
    let pb = GLOBAL_MP.add(ProgressBar::new(total));
    pb.set_style(
        ProgressStyle::default_bar()
            .progress_chars("##-")
            .template("{msg}\n{bar:40.cyan/blue} {bytes}/{total_bytes} ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    pb.set_message(message);
    pb
}
