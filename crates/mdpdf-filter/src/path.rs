//! Addresses of blocks inside a document tree.

use mdpdf_ast::Block;

/// Position of a block: one `(child list, index)` step per nesting level.
///
/// The top-level block list is child list 0 of the document. For a block
/// with several child lists (list items), the child list index selects the
/// item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct NodePath(Vec<(usize, usize)>);

impl NodePath {
    /// Path of the block at `index` in child list `list` of this node.
    pub(crate) fn child(&self, list: usize, index: usize) -> Self {
        let mut steps = self.0.clone();
        steps.push((list, index));
        Self(steps)
    }

    /// Resolve the path against the document's top-level blocks.
    pub(crate) fn get_mut<'a>(&self, blocks: &'a mut Vec<Block>) -> Option<&'a mut Block> {
        let ((_, first), rest) = self.0.split_first()?;
        let mut block = blocks.get_mut(*first)?;
        for &(list, index) in rest {
            let current = block;
            block = current.children_mut().into_iter().nth(list)?.get_mut(index)?;
        }
        Some(block)
    }
}
