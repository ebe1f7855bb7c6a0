//! Derived presentation state for code-like blocks.
//!
//! The compositor is a pure function of the document plus a little state per
//! block: a stable [`BlockId`], the highlight generation and the last good
//! visual layer. That state is keyed by block position and carried through
//! every transaction's mapping; blocks that disappear lose it.

use std::time::{Duration, Instant};

use crate::extensions::{file_code, terminal};
use crate::model::{AttrValue, Document, Element, Node, Selection};
use crate::render::clipboard::{Clipboard, ClipboardError, CopyFeedback};
use crate::render::highlight::{BlockId, HighlightRequest, HighlightResponse};
use crate::render::markup::{StyledLine, markup_to_lines, reconcile_lines};
use crate::render::{CODE_TYPOGRAPHY, Typography, WhiteSpace};
use crate::schema::Schema;
use crate::schema::blog::PACKAGE_MANAGERS;
use crate::transform::Mapping;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockKind {
    FileCode,
    Terminal,
    Plain,
}

impl BlockKind {
    fn of(node_type: &str) -> Self {
        match node_type {
            file_code::NODE => BlockKind::FileCode,
            terminal::NODE => BlockKind::Terminal,
            _ => BlockKind::Plain,
        }
    }
}

#[derive(Debug, Clone)]
struct BlockState {
    id: BlockId,
    pos: usize,
    kind: BlockKind,
    generation: u64,
    /// Text and language the current generation was requested for
    requested: Option<(String, String)>,
    /// Last successfully highlighted visual layer
    visual: Option<Vec<StyledLine>>,
    copy: CopyFeedback,
}

/// What became of a highlight response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HighlightOutcome {
    Applied,
    /// A newer request has been started since
    Stale,
    /// The block no longer exists
    Orphaned,
    /// The service failed; the previous visual layer stays
    Failed,
}

/// Header controls above a block's text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockHeader {
    FileCode { filename: String, language: String },
    Terminal { active: String, managers: Vec<&'static str> },
    None,
}

/// One line-number button of the file code block gutter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GutterButton {
    /// 1-based label
    pub number: usize,
    pub highlighted: bool,
    /// Argument for `toggle_highlighted_line`
    pub toggle_index: usize,
}

/// The transparent, caret-carrying top layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditableLayer {
    pub lines: Vec<String>,
    /// `(line, column)` in chars when the selection head is inside the block
    pub caret: Option<(usize, usize)>,
}

/// A code block ready to draw: three layers with one geometry.
///
/// `typography` and `white_space` apply to every layer alike, and each layer
/// holds exactly one entry per text line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositedBlock {
    pub id: BlockId,
    pub pos: usize,
    pub node_type: String,
    pub header: BlockHeader,
    pub typography: Typography,
    pub white_space: WhiteSpace,
    pub backdrop: Vec<bool>,
    pub visual: Vec<StyledLine>,
    pub editable: EditableLayer,
    pub gutter: Vec<GutterButton>,
    pub copied: bool,
}

impl CompositedBlock {
    pub fn line_count(&self) -> usize {
        self.editable.lines.len()
    }

    /// Every layer (and the gutter, when present) has one entry per line.
    pub fn is_aligned(&self) -> bool {
        let n = self.line_count();
        self.backdrop.len() == n
            && self.visual.len() == n
            && (self.gutter.is_empty() || self.gutter.len() == n)
    }
}

#[derive(Debug, Clone)]
pub struct Compositor {
    blocks: Vec<BlockState>,
    next_id: u64,
    requests: Vec<HighlightRequest>,
    copy_feedback: Duration,
    terminal_copy_feedback: Duration,
}

impl Compositor {
    pub fn new(copy_feedback: Duration, terminal_copy_feedback: Duration) -> Self {
        Self {
            blocks: Vec::new(),
            next_id: 0,
            requests: Vec::new(),
            copy_feedback,
            terminal_copy_feedback,
        }
    }

    /// Carry block positions through a committed transaction. Blocks whose
    /// opening was replaced are forgotten.
    pub fn map(&mut self, mapping: &Mapping) {
        self.blocks.retain_mut(|block| {
            let content = mapping.map_result(block.pos + 1);
            if content.deleted || content.pos == 0 {
                log::debug!("block {:?} deleted, dropping its state", block.id);
                return false;
            }
            block.pos = content.pos - 1;
            true
        });
    }

    /// Reconcile block state with the document and queue highlight requests
    /// for file code blocks whose text or language changed.
    pub fn sync(&mut self, schema: &Schema, doc: &Document) {
        let mut found: Vec<(usize, &Element)> = Vec::new();
        doc.descendants(|node, pos| match node {
            Node::Element(el) if schema.is_code(&el.node_type) => {
                found.push((pos, el));
                false
            }
            _ => true,
        });

        let mut previous = std::mem::take(&mut self.blocks);
        for (pos, el) in found {
            let kind = BlockKind::of(&el.node_type);
            let mut block = match previous.iter().position(|b| b.pos == pos && b.kind == kind) {
                Some(index) => previous.swap_remove(index),
                None => self.new_block(pos, kind),
            };
            if kind == BlockKind::FileCode {
                let wanted = (
                    el.text_content(),
                    el.attr("language").as_str().unwrap_or_default().to_string(),
                );
                if block.requested.as_ref() != Some(&wanted) {
                    block.generation += 1;
                    self.requests.push(HighlightRequest {
                        block: block.id,
                        generation: block.generation,
                        text: wanted.0.clone(),
                        language: wanted.1.clone(),
                    });
                    block.requested = Some(wanted);
                }
            }
            self.blocks.push(block);
        }
        for dropped in previous {
            log::debug!("block {:?} no longer in the document", dropped.id);
        }
    }

    fn new_block(&mut self, pos: usize, kind: BlockKind) -> BlockState {
        self.next_id += 1;
        let feedback = match kind {
            BlockKind::Terminal => self.terminal_copy_feedback,
            _ => self.copy_feedback,
        };
        BlockState {
            id: BlockId(self.next_id),
            pos,
            kind,
            generation: 0,
            requested: None,
            visual: None,
            copy: CopyFeedback::new(feedback),
        }
    }

    /// Requests started since the last call, oldest first.
    pub fn take_requests(&mut self) -> Vec<HighlightRequest> {
        std::mem::take(&mut self.requests)
    }

    /// Accept a response only when it answers the block's latest request.
    pub fn complete(&mut self, response: HighlightResponse) -> HighlightOutcome {
        let Some(block) = self.blocks.iter_mut().find(|b| b.id == response.block) else {
            log::debug!("dropping highlight for vanished block {:?}", response.block);
            return HighlightOutcome::Orphaned;
        };
        if response.generation != block.generation {
            log::debug!(
                "dropping stale highlight for block {:?}: generation {} (current {})",
                block.id,
                response.generation,
                block.generation
            );
            return HighlightOutcome::Stale;
        }
        match response.result {
            Ok(markup) => {
                block.visual = Some(markup_to_lines(&markup));
                HighlightOutcome::Applied
            }
            Err(err) => {
                log::warn!("highlighting block {:?} failed, keeping last layer: {err}", block.id);
                HighlightOutcome::Failed
            }
        }
    }

    pub fn block_id_at(&self, pos: usize) -> Option<BlockId> {
        self.blocks.iter().find(|b| b.pos == pos).map(|b| b.id)
    }

    /// Copy the raw text of the code block at `pos`. Returns `false` when
    /// there is no code block there.
    pub fn copy(
        &mut self,
        doc: &Document,
        pos: usize,
        clipboard: &mut dyn Clipboard,
        now: Instant,
    ) -> Result<bool, ClipboardError> {
        let Some(block) = self.blocks.iter_mut().find(|b| b.pos == pos) else {
            return Ok(false);
        };
        let Some(Node::Element(el)) = doc.node_at(pos) else {
            return Ok(false);
        };
        clipboard.write_text(&el.text_content())?;
        block.copy.start(now);
        Ok(true)
    }

    /// Composite every code block in document order.
    pub fn composite(&self, doc: &Document, selection: Selection, now: Instant) -> Vec<CompositedBlock> {
        self.blocks
            .iter()
            .filter_map(|block| {
                let Some(Node::Element(el)) = doc.node_at(block.pos) else {
                    return None;
                };
                Some(composite_block(block, el, selection, now))
            })
            .collect()
    }
}

fn composite_block(block: &BlockState, el: &Element, selection: Selection, now: Instant) -> CompositedBlock {
    let text = el.text_content();
    let lines: Vec<String> = text.split('\n').map(str::to_string).collect();

    let caret = {
        let start = block.pos + 1;
        let end = start + el.content_size();
        (start..=end).contains(&selection.head).then(|| {
            let before: String = text.chars().take(selection.head - start).collect();
            let line = before.matches('\n').count();
            let column = before.rsplit('\n').next().map_or(0, |l| l.chars().count());
            (line, column)
        })
    };

    let highlighted = match el.attr("highlightedLine") {
        AttrValue::Int(i) => usize::try_from(*i).ok(),
        _ => None,
    };

    let (header, visual, backdrop, gutter) = match block.kind {
        BlockKind::FileCode => {
            let visual = reconcile_lines(block.visual.as_deref().unwrap_or_default(), &text);
            let backdrop = (0..lines.len()).map(|i| Some(i) == highlighted).collect();
            let gutter = (0..lines.len())
                .map(|i| GutterButton {
                    number: i + 1,
                    highlighted: Some(i) == highlighted,
                    toggle_index: i,
                })
                .collect();
            let header = BlockHeader::FileCode {
                filename: el.attr("filename").as_str().unwrap_or_default().to_string(),
                language: el.attr("language").as_str().unwrap_or_default().to_string(),
            };
            (header, visual, backdrop, gutter)
        }
        BlockKind::Terminal => {
            let header = BlockHeader::Terminal {
                active: el
                    .attr("packageManager")
                    .as_str()
                    .unwrap_or(terminal::DEFAULT_MANAGER)
                    .to_string(),
                managers: PACKAGE_MANAGERS.to_vec(),
            };
            let visual = crate::render::terminal::tokenize(&text);
            (header, visual, vec![false; lines.len()], Vec::new())
        }
        BlockKind::Plain => {
            let visual = reconcile_lines(&[], &text);
            (BlockHeader::None, visual, vec![false; lines.len()], Vec::new())
        }
    };

    CompositedBlock {
        id: block.id,
        pos: block.pos,
        node_type: el.node_type.clone(),
        header,
        typography: CODE_TYPOGRAPHY,
        white_space: WhiteSpace::Pre,
        backdrop,
        visual,
        editable: EditableLayer { lines, caret },
        gutter,
        copied: block.copy.is_active(now),
    }
}
