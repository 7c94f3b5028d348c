mod daemon;
mod ping;
mod process;
mod status;
mod total;
mod visibility;

pub use daemon::execute as daemon;
pub use ping::execute as ping;
pub use process::{end as end_process, start as start_process};
pub use status::execute as status;
pub use total::execute as total;
pub use visibility::execute as visibility;

fn daemon_not_running() -> ! {
    eprintln!("⚫ Le daemon n'est pas démarré");
    eprintln!("   Lancez d'abord: validtime daemon");
    std::process::exit(1);
}

fn format_duration(milliseconds: u64) -> String {
    let total_seconds = milliseconds / 1000;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{}h {:02}min {:02}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}min {:02}s", minutes, seconds)
    } else {
        format!("{}.{:03}s", seconds, milliseconds % 1000)
    }
}

fn format_signed_duration(milliseconds: i64) -> String {
    let formatted = format_duration(milliseconds.unsigned_abs());
    if milliseconds < 0 {
        format!("-{}", formatted)
    } else {
        formatted
    }
}
