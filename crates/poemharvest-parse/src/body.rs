// Poem body extraction.
//
// Takes the first <poem> container and cleans it in three passes, each
// building a new tree from the previous one:
//   1. footnote references (<ref>) become numbered markers, their text is collected
//   2. templates are removed, keeping any footnote markers inside them
//   3. internal links are removed, likewise
// and renders what is left as plain text.

use crate::wikitext::{Node, Tag, Wikicode};
use poemharvest_model::{ExtractError, FootnoteEntry, PoemBody};
use std::collections::HashMap;

const BODY_TAG: &str = "poem";
const FOOTNOTE_TAG: &str = "ref";

/// Extract the poem text and its footnotes from a parsed page.
pub fn extract_body(document: &Wikicode) -> Result<PoemBody, ExtractError> {
    let containers = document.tags_named(BODY_TAG);
    let container = containers.first().ok_or(ExtractError::NoPoemBody)?;
    if containers.len() > 1 {
        // Repeated containers hold near-identical renderings of the same poem.
        tracing::debug!(count = containers.len(), "Multiple poem containers, using the first");
    }

    let contents = container.contents.clone().unwrap_or_default();
    Ok(clean_body(contents))
}

/// Run the footnote, template, and link passes over a body and render it.
pub fn clean_body(contents: Wikicode) -> PoemBody {
    let (code, footnotes) = number_footnotes(contents);
    let code = remove_templates(code);
    let code = remove_wikilinks(code);

    PoemBody {
        text: code.strip_code(),
        footnotes,
    }
}

/// Replace every footnote reference with a numbered marker.
///
/// Numbers start at 1 and follow document order. A self-closing named
/// reference (`<ref name="a"/>`) repeats the text of the earlier reference
/// with that name, and still takes the next number.
fn number_footnotes(code: Wikicode) -> (Wikicode, Vec<FootnoteEntry>) {
    let mut footnotes: Vec<FootnoteEntry> = Vec::new();
    let mut named: HashMap<String, String> = HashMap::new();

    let code = code.rewrite(&mut |node| {
        let Node::Tag(tag) = node else {
            return None;
        };
        if !tag.is(FOOTNOTE_TAG) {
            return None;
        }

        let number = footnotes.len() as u32 + 1;
        let text = footnote_text(tag, &mut named);
        footnotes.push(FootnoteEntry { number, text });
        Some(vec![Node::FootnoteMarker(number)])
    });

    (code, footnotes)
}

fn footnote_text(tag: &Tag, named: &mut HashMap<String, String>) -> String {
    let name = tag.attr("name");
    match &tag.contents {
        Some(contents) => {
            let text = contents.strip_code().trim().to_string();
            if let Some(name) = name {
                named.insert(name, text.clone());
            }
            text
        }
        None => name
            .and_then(|n| named.get(&n).cloned())
            .unwrap_or_default(),
    }
}

fn remove_templates(code: Wikicode) -> Wikicode {
    code.rewrite(&mut |node| matches!(node, Node::Template(_)).then(|| nested_markers(node)))
}

fn remove_wikilinks(code: Wikicode) -> Wikicode {
    code.rewrite(&mut |node| matches!(node, Node::WikiLink(_)).then(|| nested_markers(node)))
}

/// The footnote markers inside a node that is about to be removed.
///
/// Footnotes are numbered before templates and links are removed, so every
/// marker must outlive the node that held it.
fn nested_markers(node: &Node) -> Vec<Node> {
    let mut markers = Vec::new();
    for child in node.children() {
        child.walk(&mut |n| {
            if let Node::FootnoteMarker(number) = n {
                markers.push(Node::FootnoteMarker(*number));
            }
        });
    }
    markers
}
