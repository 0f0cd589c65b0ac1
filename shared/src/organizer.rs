//! Moving videos within and across brackets of a section.
//!
//! Positions use insertion-indicator semantics: `to.index` is the gap the
//! video is dropped into, counted in the target list *before* the dragged
//! video is taken out of it.

use crate::error::{Result, SharedError};
use crate::models::event::{Section, Video};
use serde::{Deserialize, Serialize};

/// A position in a section's direct list (`bracket_id == None`) or in a bracket
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VideoSlot {
    #[serde(default)]
    pub bracket_id: Option<String>,
    pub index: usize,
}

impl VideoSlot {
    pub fn direct(index: usize) -> Self {
        Self {
            bracket_id: None,
            index,
        }
    }

    pub fn in_bracket(bracket_id: impl Into<String>, index: usize) -> Self {
        Self {
            bracket_id: Some(bracket_id.into()),
            index,
        }
    }
}

/// Where a gap index lands once the dragged item has been removed
fn insertion_index(from: usize, to: usize, same_list: bool, len_after_removal: usize) -> usize {
    let adjusted = if same_list && from < to { to - 1 } else { to };
    adjusted.min(len_after_removal)
}

fn list_mut<'a>(section: &'a mut Section, bracket_id: Option<&str>) -> Result<&'a mut Vec<Video>> {
    match bracket_id {
        None => {
            if section.has_brackets {
                return Err(SharedError::BadRequest(format!(
                    "Section '{}' keeps its videos in brackets",
                    section.title
                )));
            }
            Ok(&mut section.videos)
        }
        Some(id) => {
            if !section.has_brackets {
                return Err(SharedError::BadRequest(format!(
                    "Section '{}' does not use brackets",
                    section.title
                )));
            }
            section
                .brackets
                .iter_mut()
                .find(|b| b.id == id)
                .map(|b| &mut b.videos)
                .ok_or_else(|| SharedError::NotFound(format!("Bracket {} not found", id)))
        }
    }
}

/// Move one video. On error the section is left untouched.
pub fn move_video(section: &mut Section, from: &VideoSlot, to: &VideoSlot) -> Result<()> {
    // Resolve the target first so a bad target never loses the video
    list_mut(section, to.bracket_id.as_deref())?;

    let source = list_mut(section, from.bracket_id.as_deref())?;
    if from.index >= source.len() {
        return Err(SharedError::NotFound(format!(
            "No video at position {}",
            from.index
        )));
    }
    let video = source.remove(from.index);

    let same_list = from.bracket_id == to.bracket_id;
    let target = list_mut(section, to.bracket_id.as_deref())?;
    let at = insertion_index(from.index, to.index, same_list, target.len());
    target.insert(at, video);
    Ok(())
}

/// Reorder brackets using the same gap semantics
pub fn reorder_brackets(section: &mut Section, from: usize, to: usize) -> Result<()> {
    if !section.has_brackets {
        return Err(SharedError::BadRequest(format!(
            "Section '{}' does not use brackets",
            section.title
        )));
    }
    if from >= section.brackets.len() {
        return Err(SharedError::NotFound(format!("No bracket at position {}", from)));
    }
    let bracket = section.brackets.remove(from);
    let at = insertion_index(from, to, true, section.brackets.len());
    section.brackets.insert(at, bracket);
    Ok(())
}
