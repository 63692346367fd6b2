//! Room and lecturer records turned into per-floor anchor lists.

use formats::FloorEntry;
use serde::{Deserialize, Serialize};

use crate::anchor::{AnchorContent, AnchorInput, AnchorKind};

const DEFAULT_LECTURER_DESCRIPTION: &str = "Lecturer";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomRecord {
    #[serde(alias = "roomID", alias = "id")]
    pub room_id: String,
    #[serde(default, alias = "currentName")]
    pub room_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub floor: Option<String>,
    #[serde(default)]
    pub position: Option<[f64; 3]>,
    #[serde(default)]
    pub capacity: Option<u32>,
    #[serde(default)]
    pub room_type: Option<String>,
}

/// Either a single string or a list of fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Expertise {
    One(String),
    Many(Vec<String>),
}

impl Expertise {
    /// Joined with `", "`; `None` when there is nothing to show.
    pub fn summary(&self) -> Option<String> {
        let text = match self {
            Expertise::One(s) => s.trim().to_string(),
            Expertise::Many(items) => items
                .iter()
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join(", "),
        };
        (!text.is_empty()).then_some(text)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LecturerRecord {
    #[serde(default)]
    pub id: String,
    #[serde(default, alias = "displayName", alias = "username")]
    pub display_name: String,
    #[serde(default)]
    pub surname: Option<String>,
    #[serde(default, alias = "photo")]
    pub photo_url: Option<String>,
    #[serde(alias = "roomID", alias = "room")]
    pub room_id: String,
    #[serde(default)]
    pub floor: Option<String>,
    #[serde(default)]
    pub expertise: Option<Expertise>,
}

/// Case-insensitive "record floor mentions this floor" test.
///
/// Both the floor id and its display name count, so `"Second Floor"` matches
/// a floor with id `second`.
pub fn floor_matches(record_floor: &str, floor: &FloorEntry) -> bool {
    let record = record_floor.trim().to_lowercase();
    if record.is_empty() {
        return false;
    }
    [floor.id.as_str(), floor.name.as_str()]
        .iter()
        .map(|k| k.trim().to_lowercase())
        .any(|k| !k.is_empty() && record.contains(&k))
}

/// Anchor list for one floor.
///
/// - Rooms on the floor are positioned by their own position, else by the
///   floor's position table.
/// - Lecturers are keyed by their room id and positioned from the table or
///   the matching room. A lecturer replaces the room anchor with that id.
/// - Lecturers without a floor are kept when their room is on this floor.
/// - Records with no resolvable position are dropped.
pub fn anchors_for_floor(
    floor: &FloorEntry,
    rooms: &[RoomRecord],
    lecturers: &[LecturerRecord],
) -> Vec<AnchorInput> {
    let floor_rooms: Vec<&RoomRecord> = rooms
        .iter()
        .filter(|r| r.floor.as_deref().is_some_and(|f| floor_matches(f, floor)))
        .collect();

    let room_position = |room_id: &str| -> Option<[f64; 3]> {
        floor.position_of(room_id).or_else(|| {
            rooms
                .iter()
                .find(|r| r.room_id.eq_ignore_ascii_case(room_id))
                .and_then(|r| r.position)
        })
    };

    let mut out: Vec<AnchorInput> = Vec::new();

    for room in &floor_rooms {
        let Some(position) = room.position.or_else(|| floor.position_of(&room.room_id)) else {
            continue;
        };
        let title = if room.room_name.trim().is_empty() {
            room.room_id.clone()
        } else {
            room.room_name.clone()
        };
        out.push(AnchorInput::new(
            room.room_id.clone(),
            Some(position),
            AnchorContent {
                title,
                subtitle: room.room_type.clone(),
                image: None,
                description: room.description.clone().unwrap_or_default(),
                kind: AnchorKind::Room,
            },
        ));
    }

    for lecturer in lecturers {
        if lecturer.room_id.trim().is_empty() {
            continue;
        }
        let on_floor = match lecturer.floor.as_deref().filter(|f| !f.trim().is_empty()) {
            Some(f) => floor_matches(f, floor),
            None => {
                floor.position_of(&lecturer.room_id).is_some()
                    || floor_rooms
                        .iter()
                        .any(|r| r.room_id.eq_ignore_ascii_case(&lecturer.room_id))
            }
        };
        if !on_floor {
            continue;
        }
        let Some(position) = room_position(&lecturer.room_id) else {
            continue;
        };

        let anchor = AnchorInput::new(
            lecturer.room_id.clone(),
            Some(position),
            AnchorContent {
                title: lecturer.display_name.clone(),
                subtitle: lecturer.surname.clone().filter(|s| !s.is_empty()),
                image: lecturer.photo_url.clone().filter(|s| !s.is_empty()),
                description: lecturer
                    .expertise
                    .as_ref()
                    .and_then(Expertise::summary)
                    .unwrap_or_else(|| DEFAULT_LECTURER_DESCRIPTION.to_string()),
                kind: AnchorKind::Lecturer,
            },
        );

        match out
            .iter_mut()
            .find(|a| a.id.eq_ignore_ascii_case(&anchor.id))
        {
            Some(existing) if existing.content.kind == AnchorKind::Room => *existing = anchor,
            Some(_) => {
                tracing::debug!(room = %anchor.id, "second lecturer for room ignored");
            }
            None => out.push(anchor),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::{Expertise, LecturerRecord, RoomRecord, anchors_for_floor, floor_matches};
    use crate::anchor::AnchorKind;
    use formats::FloorEntry;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    fn second_floor() -> FloorEntry {
        let mut positions = BTreeMap::new();
        positions.insert("studio-02a".to_string(), [24.0, 8.0, 2.0]);
        positions.insert("ap1-218".to_string(), [10.0, 8.0, -8.0]);
        FloorEntry {
            id: "second".into(),
            name: "Second Floor".into(),
            model_src: "Annex12F.gltf".into(),
            fallback_sources: Vec::new(),
            positions,
        }
    }

    fn room(id: &str, floor: &str, position: Option<[f64; 3]>) -> RoomRecord {
        RoomRecord {
            room_id: id.into(),
            room_name: format!("Room {id}"),
            description: None,
            floor: Some(floor.into()),
            position,
            capacity: None,
            room_type: None,
        }
    }

    #[test]
    fn floor_matching_is_case_insensitive_substring() {
        let f = second_floor();
        assert!(floor_matches("SECOND FLOOR", &f));
        assert!(floor_matches("second", &f));
        assert!(!floor_matches("Floor", &f));
        assert!(!floor_matches("Third Floor", &f));
        assert!(!floor_matches("", &f));
    }

    #[test]
    fn rooms_use_own_position_then_table() {
        let rooms = vec![
            room("studio-02a", "Second Floor", None),
            room("crit-main", "second floor", Some([-24.0, 8.0, 0.0])),
            room("mystery", "Second Floor", None),
            room("studio-03a", "Third Floor", Some([1.0, 1.0, 1.0])),
        ];
        let anchors = anchors_for_floor(&second_floor(), &rooms, &[]);
        let got: Vec<(String, Option<[f64; 3]>)> =
            anchors.into_iter().map(|a| (a.id, a.position)).collect();
        assert_eq!(
            got,
            vec![
                ("studio-02a".to_string(), Some([24.0, 8.0, 2.0])),
                ("crit-main".to_string(), Some([-24.0, 8.0, 0.0])),
            ]
        );
    }

    #[test]
    fn lecturer_replaces_room_anchor() {
        let rooms = vec![room("ap1-218", "Second Floor", None)];
        let lecturers = vec![LecturerRecord {
            id: "u1".into(),
            display_name: "Dr Fazidah".into(),
            surname: Some("Hanim".into()),
            photo_url: Some("/public/photos/u1.jpg".into()),
            room_id: "AP1-218".into(),
            floor: Some("Second Floor".into()),
            expertise: Some(Expertise::Many(vec!["Heritage".into(), " Urbanism ".into()])),
        }];
        let anchors = anchors_for_floor(&second_floor(), &rooms, &lecturers);
        assert_eq!(anchors.len(), 1);
        let a = &anchors[0];
        assert_eq!(a.id, "AP1-218");
        assert_eq!(a.position, Some([10.0, 8.0, -8.0]));
        assert_eq!(a.content.kind, AnchorKind::Lecturer);
        assert_eq!(a.content.description, "Heritage, Urbanism");
        assert_eq!(a.content.subtitle.as_deref(), Some("Hanim"));
    }

    #[test]
    fn lecturer_without_floor_is_placed_by_room_table() {
        let lecturers: Vec<LecturerRecord> = serde_json::from_str(
            r#"[
                {"displayName": "En Amran", "roomID": "ap1-218", "expertise": ""},
                {"displayName": "Elsewhere", "roomID": "ap9-999"}
            ]"#,
        )
        .expect("json");
        let anchors = anchors_for_floor(&second_floor(), &[], &lecturers);
        assert_eq!(anchors.len(), 1);
        assert_eq!(anchors[0].content.title, "En Amran");
        assert_eq!(anchors[0].content.description, "Lecturer");
    }

    #[test]
    fn room_records_accept_original_field_names() {
        let r: RoomRecord = serde_json::from_str(
            r#"{"roomID": "studio-02a", "room_name": "Studio A", "floor": "Second Floor"}"#,
        )
        .expect("json");
        assert_eq!(r.room_id, "studio-02a");
        assert_eq!(r.position, None);
    }
}
