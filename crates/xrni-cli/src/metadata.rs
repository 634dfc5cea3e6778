//! The `tag` and `comment` commands. Changes are saved in place.

use crate::{for_each_file, CommentArgs, TagArgs};
use anyhow::{Context, Result};
use std::io::{self, Read};
use std::path::Path;
use xrni_core::InstrumentDocument;

pub fn tag(args: TagArgs) -> Result<()> {
    for_each_file(&args.files, "tag", |file| {
        let mut doc = load(file)?;

        if !args.clear && args.add.is_empty() && args.remove.is_empty() {
            let tags = doc.tags();
            if tags.is_empty() {
                println!("<no tag found>");
            } else {
                println!("{}", tags.join("\n"));
            }
            return Ok(());
        }

        apply_tag_changes(&mut doc, &args);
        save_in_place(&mut doc, file)
    })
}

fn apply_tag_changes(doc: &mut InstrumentDocument, args: &TagArgs) {
    if args.clear {
        doc.clear_tags();
    }
    for tag in &args.remove {
        if !doc.remove_tag(tag) {
            log::warn!("No tag '{}' to remove", tag);
        }
    }
    for tag in &args.add {
        doc.append_tag(tag);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CommentAction {
    View,
    Edit,
    Append,
    Remove,
}

impl CommentAction {
    fn from_args(args: &CommentArgs) -> Self {
        if args.remove {
            CommentAction::Remove
        } else if args.edit {
            CommentAction::Edit
        } else if args.append {
            CommentAction::Append
        } else {
            CommentAction::View
        }
    }
}

pub fn comment(args: CommentArgs) -> Result<()> {
    let action = CommentAction::from_args(&args);

    let message = match (action, &args.message) {
        (CommentAction::Edit | CommentAction::Append, None) => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read comment from standard input")?;
            text
        }
        (_, message) => message.clone().unwrap_or_default(),
    };

    for_each_file(&args.files, "update comment of", |file| {
        let mut doc = load(file)?;
        if action == CommentAction::View {
            println!("{}", doc.comment().unwrap_or_default());
            return Ok(());
        }
        apply_comment(&mut doc, action, &message);
        save_in_place(&mut doc, file)
    })
}

fn apply_comment(doc: &mut InstrumentDocument, action: CommentAction, message: &str) {
    match action {
        CommentAction::Edit => doc.set_comment(message),
        CommentAction::Append => doc.append_comment(message),
        CommentAction::Remove => doc.remove_comment(),
        CommentAction::View => {}
    }
}

fn load(file: &Path) -> Result<InstrumentDocument> {
    InstrumentDocument::load(file).with_context(|| format!("Failed to load {}", file.display()))
}

/// Overwrite `file` without the cleanup pass, so keyzones and modulation
/// sets are written back exactly as loaded.
fn save_in_place(doc: &mut InstrumentDocument, file: &Path) -> Result<()> {
    doc.save(file, true, false)
        .with_context(|| format!("Failed to save {}", file.display()))?;
    log::info!("Updated {}", file.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;
    use xrni_core::TemplateSource;

    fn instrument(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("lead.xrni");
        let mut doc = InstrumentDocument::new_from_template(&TemplateSource::default()).unwrap();
        doc.save(&path, false, false).unwrap();
        path
    }

    #[test]
    fn test_tag_add_and_remove() {
        let dir = TempDir::new().unwrap();
        let path = instrument(&dir);

        tag(TagArgs {
            files: vec![path.clone()],
            add: vec!["bass".into(), "analog".into()],
            remove: vec![],
            clear: false,
        })
        .unwrap();
        tag(TagArgs {
            files: vec![path.clone()],
            add: vec!["mono".into()],
            remove: vec!["bass".into()],
            clear: false,
        })
        .unwrap();

        let doc = InstrumentDocument::load(&path).unwrap();
        assert_eq!(doc.tags(), vec!["analog".to_string(), "mono".to_string()]);
    }

    #[test]
    fn test_tag_clear() {
        let dir = TempDir::new().unwrap();
        let path = instrument(&dir);
        let mut doc = InstrumentDocument::load(&path).unwrap();
        doc.append_tag("pad");
        save_in_place(&mut doc, &path).unwrap();

        let args = TagArgs {
            files: vec![path.clone()],
            add: vec![],
            remove: vec![],
            clear: true,
        };
        tag(args).unwrap();
        assert!(InstrumentDocument::load(&path).unwrap().tags().is_empty());
    }

    #[test]
    fn test_metadata_edits_leave_zones_untouched() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("layers.xrni");
        let mut doc = InstrumentDocument::new_from_template(&TemplateSource::default()).unwrap();
        let (sample, set) = doc.templates().map(|(s, m)| (s.clone(), m.clone())).unwrap();
        for idx in 0..2 {
            let mut sample = sample.clone();
            sample.set_modulation_set_index(idx);
            sample.set_note_range(40, 130);
            doc.push_zone(sample, set.clone(), b"RIFF".to_vec());
        }
        doc.save(&path, false, false).unwrap();
        let before = InstrumentDocument::load(&path).unwrap();

        tag(TagArgs {
            files: vec![path.clone()],
            add: vec!["layered".into()],
            remove: vec![],
            clear: false,
        })
        .unwrap();
        comment(CommentArgs {
            files: vec![path.clone()],
            append: false,
            edit: true,
            remove: false,
            message: Some("two identical sets".into()),
        })
        .unwrap();

        let after = InstrumentDocument::load(&path).unwrap();
        assert_eq!(after.modulation_sets().len(), 2);
        assert_eq!(after.modulation_sets(), before.modulation_sets());
        assert_eq!(after.samples(), before.samples());
        assert_eq!(after.samples()[1].note_end(), 130);
    }

    #[test]
    fn test_comment_edit_append_remove() {
        let dir = TempDir::new().unwrap();
        let path = instrument(&dir);
        let comment_args = |edit, append, remove, message: &str| CommentArgs {
            files: vec![path.clone()],
            append,
            edit,
            remove,
            message: Some(message.to_string()),
        };

        comment(comment_args(true, false, false, "First line")).unwrap();
        comment(comment_args(false, true, false, "Second line")).unwrap();
        let doc = InstrumentDocument::load(&path).unwrap();
        assert_eq!(doc.comment().as_deref(), Some("First line\nSecond line"));

        comment(comment_args(false, false, true, "")).unwrap();
        let doc = InstrumentDocument::load(&path).unwrap();
        assert_eq!(doc.comment(), None);
    }
}
