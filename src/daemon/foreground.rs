//! Foreground-application detection. The daemon only ever consumes the
//! normalized category; raw names from the OS go through the lookup table
//! below and unmapped ones pass through unchanged.

use anyhow::Result;

#[cfg_attr(test, mockall::automock)]
pub trait ForegroundDetector: Send {
    /// Raw name of the application currently holding focus.
    fn frontmost_app(&mut self) -> Result<String>;
}

/// Detection via external commands, matching what each desktop offers.
pub struct CommandDetector;

impl ForegroundDetector for CommandDetector {
    #[cfg(target_os = "macos")]
    fn frontmost_app(&mut self) -> Result<String> {
        const SCRIPT: &str = "tell application \"System Events\" to get name of first application process whose frontmost is true";
        let output = std::process::Command::new("osascript")
            .args(["-e", SCRIPT])
            .output()?;
        if !output.status.success() {
            anyhow::bail!("osascript exited with {}", output.status);
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    #[cfg(not(target_os = "macos"))]
    fn frontmost_app(&mut self) -> Result<String> {
        // X11 desktops usually have xdotool; anything else reports Unknown
        // and scores with the default impact.
        let output = std::process::Command::new("xdotool")
            .args(["getactivewindow", "getwindowclassname"])
            .output();
        match output {
            Ok(output) if output.status.success() => {
                Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
            }
            _ => Ok("Unknown".to_string()),
        }
    }
}

/// Raw application name to one of the fixed categories the impact table
/// knows about. Unmapped names pass through so they still show up in usage
/// summaries under their own name.
pub fn normalize_category(raw: &str) -> String {
    let mapped = match raw {
        "Visual Studio Code" | "Code" | "Cursor" | "IntelliJ IDEA" | "Xcode" | "sublime_text" => {
            "Code Editor"
        }
        "Terminal" | "iTerm2" | "iTerm" | "kitty" | "Alacritty" => "Terminal",
        "Google Chrome" | "Safari" | "Firefox" | "Microsoft Edge" | "Arc" => "Browser",
        "Slack" => "Slack",
        "Microsoft Teams" | "Zoom" | "zoom.us" => "Video Conference",
        "Mail" | "Outlook" | "Thunderbird" => "Email",
        "Figma" | "Sketch" | "Adobe Photoshop" | "Adobe Illustrator" => "Design Tool",
        "Notion" | "Obsidian" | "Notes" | "Microsoft Word" | "Pages" => "Documentation",
        "ChatGPT" | "Claude" => "AI Assistant",
        "Discord" | "Telegram" | "WhatsApp" | "Messages" => "Communication",
        other => other,
    };
    mapped.to_string()
}

#[cfg(test)]
mod tests {
    use super::normalize_category;

    #[test]
    fn editors_collapse_to_one_category() {
        assert_eq!(normalize_category("Visual Studio Code"), "Code Editor");
        assert_eq!(normalize_category("Cursor"), "Code Editor");
        assert_eq!(normalize_category("Xcode"), "Code Editor");
    }

    #[test]
    fn unmapped_names_pass_through() {
        assert_eq!(normalize_category("Blender"), "Blender");
    }
}
