//! One-line progress status for long batch runs.

use std::io::Write;

/// `[****      ] 40%`: bar filled to `step·width/num_steps`, percentage
/// zero-padded to two digits.
pub fn format_status(step: usize, num_steps: usize, width: usize) -> String {
    let num_steps = num_steps.max(1);
    let step = step.min(num_steps);
    let filled = step * width / num_steps;
    let percent = step * 100 / num_steps;
    format!("[{}{}] {percent:02}%", "*".repeat(filled), " ".repeat(width - filled))
}

/// Overwrite the current stderr line with the status bar.
pub fn print_status(step: usize, num_steps: usize, width: usize) {
    let mut err = std::io::stderr().lock();
    // Progress output is best-effort.
    let _ = write!(err, "\r{}", format_status(step, num_steps, width));
    if step >= num_steps {
        let _ = writeln!(err);
    }
    let _ = err.flush();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_bar_fill_and_percentage() {
        assert_eq!(format_status(4, 10, 10), "[****      ] 40%");
        assert_eq!(format_status(0, 10, 10), "[          ] 00%");
        assert_eq!(format_status(1, 20, 10), "[          ] 05%");
        assert_eq!(format_status(10, 10, 5), "[*****] 100%");
    }

    #[test]
    fn status_bar_clamps_overshoot() {
        assert_eq!(format_status(15, 10, 4), "[****] 100%");
        assert_eq!(format_status(0, 0, 3), "[   ] 00%");
    }
}
