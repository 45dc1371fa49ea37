//! Maps an incoming message onto draft fragments.

use crate::flow::Fragment;
use crate::telegram::Message;

/// Text and caption first, then one descriptor per attachment kind.
#[must_use]
pub fn fragments(message: &Message) -> Vec<Fragment> {
    let mut out = Vec::new();

    for text in [&message.text, &message.caption].into_iter().flatten() {
        out.push(Fragment::Text(text.clone()));
    }

    if message.photo.is_some() {
        out.push(Fragment::Attachment("Фото".to_owned()));
    }
    if let Some(doc) = &message.document {
        let name = doc.file_name.as_deref().unwrap_or("без имени");
        out.push(Fragment::Attachment(format!("Документ: {name}")));
    }
    if let Some(audio) = &message.audio {
        let name = audio.file_name.as_deref().unwrap_or("audio");
        out.push(Fragment::Attachment(format!("Аудио: {name}")));
    }
    if message.voice.is_some() {
        out.push(Fragment::Attachment("Голосовое".to_owned()));
    }
    if message.video.is_some() {
        out.push(Fragment::Attachment("Видео".to_owned()));
    }
    if message.video_note.is_some() {
        out.push(Fragment::Attachment("Видео-кружок".to_owned()));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(extra: serde_json::Value) -> Message {
        let mut value = serde_json::json!({"message_id": 1, "chat": {"id": 5}});
        if let (Some(base), Some(extra)) = (value.as_object_mut(), extra.as_object()) {
            base.extend(extra.clone());
        }
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_document_with_caption() {
        let msg = message(serde_json::json!({
            "caption": "ТЗ во вложении",
            "document": {"file_id": "f", "file_name": "tz.pdf"}
        }));
        assert_eq!(
            fragments(&msg),
            vec![
                Fragment::Text("ТЗ во вложении".to_owned()),
                Fragment::Attachment("Документ: tz.pdf".to_owned()),
            ]
        );
    }

    #[test]
    fn test_unnamed_files_get_defaults() {
        let msg = message(serde_json::json!({
            "document": {"file_id": "f"},
            "audio": {"file_id": "a"}
        }));
        assert_eq!(
            fragments(&msg),
            vec![
                Fragment::Attachment("Документ: без имени".to_owned()),
                Fragment::Attachment("Аудио: audio".to_owned()),
            ]
        );
    }

    #[test]
    fn test_media_kinds() {
        let msg = message(serde_json::json!({
            "photo": [{"file_id": "p"}],
            "voice": {"file_id": "v"},
            "video": {"file_id": "w"},
            "video_note": {"file_id": "n"}
        }));
        assert_eq!(
            fragments(&msg),
            vec![
                Fragment::Attachment("Фото".to_owned()),
                Fragment::Attachment("Голосовое".to_owned()),
                Fragment::Attachment("Видео".to_owned()),
                Fragment::Attachment("Видео-кружок".to_owned()),
            ]
        );
    }
}
