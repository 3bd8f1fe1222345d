use std::{
    fs::File,
    io::{self, BufRead},
    path::Path,
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LabelsError {
    #[error("Failed to read labels: {0}")]
    Io(#[from] io::Error),
    #[error("Invalid line format at line {line}: {content}")]
    InvalidLine { line: usize, content: String },
    #[error("Invalid {channel} value at line {line}")]
    InvalidColor { line: usize, channel: &'static str },
}

/// Display name and drawing color of one model class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorLabel {
    pub label: String,
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

pub fn load_yolov8_labels(filepath: &Path) -> Result<Vec<ColorLabel>, LabelsError> {
    let file = File::open(filepath)?;
    let labels = parse_labels(io::BufReader::new(file))?;
    tracing::info!("Loaded {} class labels from {:?}", labels.len(), filepath);
    Ok(labels)
}

/// Parses `name,red,green,blue` lines; the line index is the class id.
///
/// Blank lines are accepted only at the end of the file.
pub fn parse_labels<R: BufRead>(reader: R) -> Result<Vec<ColorLabel>, LabelsError> {
    let mut color_labels = Vec::new();
    let mut first_blank_line = None;

    for (index, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        let line_number = index + 1;
        if line.trim().is_empty() {
            first_blank_line.get_or_insert(line_number);
            continue;
        }
        if let Some(blank_line) = first_blank_line {
            return Err(LabelsError::InvalidLine {
                line: blank_line,
                content: String::new(),
            });
        }

        let parts: Vec<&str> = line.split(',').collect();
        if parts.len() != 4 {
            return Err(LabelsError::InvalidLine {
                line: line_number,
                content: line,
            });
        }

        let channel = |value: &str, channel: &'static str| {
            value.trim().parse::<u8>().map_err(|_| LabelsError::InvalidColor {
                line: line_number,
                channel,
            })
        };

        color_labels.push(ColorLabel {
            label: parts[0].trim().to_string(),
            red: channel(parts[1], "red")?,
            green: channel(parts[2], "green")?,
            blue: channel(parts[3], "blue")?,
        });
    }

    Ok(color_labels)
}
