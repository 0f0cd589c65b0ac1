use crate::models::event::{Event, EventKind, Section, SectionKind};
use crate::video::{thumbnail_url, youtube_id};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TvVideoDto {
    pub id: String,
    pub title: String,
    pub src: String,
    pub youtube_id: Option<String>,
    pub thumbnail: Option<String>,
    /// Bracket the video belongs to, if any
    pub bracket_title: Option<String>,
}

/// One row of the TV viewer: a section and its videos in play order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TvSectionDto {
    pub event_id: String,
    pub event_title: String,
    pub event_kind: EventKind,
    pub event_date: Option<NaiveDate>,
    pub section_id: String,
    pub section_title: String,
    pub section_kind: SectionKind,
    pub videos: Vec<TvVideoDto>,
}

impl TvSectionDto {
    /// `None` for sections without videos
    pub fn from_section(event: &Event, section: &Section) -> Option<Self> {
        let mut videos: Vec<TvVideoDto> = section
            .videos
            .iter()
            .map(|v| tv_video(v, None))
            .collect();
        for bracket in &section.brackets {
            videos.extend(
                bracket
                    .videos
                    .iter()
                    .map(|v| tv_video(v, Some(bracket.title.clone()))),
            );
        }
        if videos.is_empty() {
            return None;
        }
        Some(Self {
            event_id: event.id.clone(),
            event_title: event.details.title.clone(),
            event_kind: event.kind,
            event_date: event.details.first_date(),
            section_id: section.id.clone(),
            section_title: section.title.clone(),
            section_kind: section.kind,
            videos,
        })
    }

    /// All playable sections of an event in section order
    pub fn from_event(event: &Event) -> Vec<Self> {
        event
            .sections
            .iter()
            .filter_map(|s| Self::from_section(event, s))
            .collect()
    }
}

fn tv_video(video: &crate::models::event::Video, bracket_title: Option<String>) -> TvVideoDto {
    TvVideoDto {
        id: video.id.clone(),
        title: video.title.clone(),
        src: video.src.clone(),
        youtube_id: youtube_id(&video.src),
        thumbnail: thumbnail_url(&video.src),
        bracket_title,
    }
}

/// A page of the infinite-scroll feed
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TvPage {
    pub sections: Vec<TvSectionDto>,
    pub next_offset: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::event::fixtures::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_sections_are_skipped_and_brackets_flattened() {
        let event = event(
            EventKind::Competition,
            vec![
                flat_section("empty", &[]),
                bracketed_section("s1", vec![("top8", vec!["a", "b"]), ("final", vec!["c"])]),
            ],
        );
        let sections = TvSectionDto::from_event(&event);
        assert_eq!(sections.len(), 1);
        let ids: Vec<_> = sections[0].videos.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(sections[0].videos[2].bracket_title.as_deref(), Some("Bracket final"));
        assert_eq!(sections[0].videos[0].youtube_id.as_deref(), Some("dQw4w9WgXcQ"));
    }
}
