use std::collections::{BTreeSet, HashMap};

use tracing::warn;

use domain::{split_segments, Priority, Wanted};

use crate::events::TreeEvent;

pub const COL_NAME: usize = 0;
pub const COL_SIZE: usize = 1;
pub const COL_PROGRESS: usize = 2;
pub const COL_WANTED: usize = 3;
pub const COL_PRIORITY: usize = 4;
pub const NUM_COLUMNS: usize = 5;

/// Arena index of a tree node. Ids stay valid until the next `clear`.
pub type NodeId = usize;

const ROOT: NodeId = 0;

#[derive(Debug)]
struct FileNode {
    name: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    /// name -> row cache for the children; entries at rows below
    /// `first_unhashed_row` are trustworthy, the rest are rebuilt
    /// lazily on the next keyed lookup.
    child_rows: HashMap<String, usize>,
    first_unhashed_row: usize,
    /// Present on leaves only; directories carry no file index and
    /// derive size/progress/wanted/priority from their descendants.
    file_index: Option<i32>,
    wanted: bool,
    priority: Priority,
    total_size: u64,
    have_size: u64,
}

impl FileNode {
    fn root() -> Self {
        Self::directory("")
    }

    fn directory(name: &str) -> Self {
        Self {
            name: name.to_string(),
            parent: None,
            children: Vec::new(),
            child_rows: HashMap::new(),
            first_unhashed_row: 0,
            file_index: None,
            wanted: true,
            priority: Priority::Normal,
            total_size: 0,
            have_size: 0,
        }
    }

    fn leaf(
        name: &str,
        file_index: i32,
        wanted: bool,
        priority: Priority,
        total_size: u64,
        have_size: u64,
    ) -> Self {
        Self {
            file_index: Some(file_index),
            wanted,
            priority,
            total_size,
            have_size,
            ..Self::directory(name)
        }
    }

    fn is_leaf(&self) -> bool {
        self.file_index.is_some()
    }
}

/// Persistent tree of named nodes built from a flat stream of leaf
/// rows (a torrent's file manifest), reporting the minimal set of
/// changed columns per affected node.
///
/// Nodes live in an arena addressed by index, with plain-index parent
/// back-references. Individual leaves are never pruned; the only
/// removal path is a whole-tree [`clear`](Self::clear), which is safe
/// because file manifests do not change after torrent creation.
#[derive(Debug)]
pub struct FileTreeModel {
    nodes: Vec<FileNode>,
    index_cache: HashMap<i32, NodeId>,
    events: Vec<TreeEvent>,
}

impl Default for FileTreeModel {
    fn default() -> Self {
        Self::new()
    }
}

impl FileTreeModel {
    pub fn new() -> Self {
        Self {
            nodes: vec![FileNode::root()],
            index_cache: HashMap::new(),
            events: Vec::new(),
        }
    }

    pub fn root() -> NodeId {
        ROOT
    }

    pub fn is_empty(&self) -> bool {
        self.nodes[ROOT].children.is_empty()
    }

    /// Drops every node, emitting removals bottom-up. Used when the
    /// inspected entity set changes.
    pub fn clear(&mut self) {
        let children = self.nodes[ROOT].children.clone();

        for &child in children.iter().rev() {
            self.remove_subtree(child);
        }

        self.nodes = vec![FileNode::root()];
        self.index_cache.clear();
    }

    /// Creates or updates the leaf at `path`, creating intermediate
    /// directories as needed.
    ///
    /// When `bulk_refresh` is false (a progress-only partial poll),
    /// only `have` is written to an existing leaf; `wanted` and
    /// `priority` stay untouched so a stale poll cannot clobber an
    /// in-flight user edit. A full refresh carries authoritative
    /// values for all three.
    ///
    /// A malformed path skips this entry only; the rest of the batch
    /// is unaffected.
    pub fn add_file(
        &mut self,
        index: i32,
        path: &str,
        wanted: bool,
        priority: Priority,
        size: u64,
        have: u64,
        bulk_refresh: bool,
    ) {
        let segments = match split_segments(path) {
            Ok(segments) => segments,
            Err(err) => {
                warn!(%err, file_index = index, "skipping file row");
                return;
            }
        };

        let mut cur = ROOT;
        let last = segments.len() - 1;

        for (depth, segment) in segments.iter().enumerate() {
            let existing = self.child_named(cur, segment);

            if depth < last {
                cur = match existing {
                    Some(dir) => dir,
                    None => self.append_child(cur, FileNode::directory(segment)),
                };
            } else {
                match existing {
                    Some(leaf) => {
                        if let Some((first, last_col)) =
                            self.update_leaf(leaf, wanted, priority, have, bulk_refresh)
                        {
                            self.emit_range(leaf, first, last_col);
                            self.emit_parents_range(leaf, first, last_col);
                        }
                    }
                    None => {
                        let leaf = self.append_child(
                            cur,
                            FileNode::leaf(segment, index, wanted, priority, size, have),
                        );
                        self.index_cache.insert(index, leaf);
                        self.emit_parents_range(leaf, COL_SIZE, COL_PRIORITY);
                    }
                }
            }
        }
    }

    /// Sets `wanted` on the given nodes and all their descendants.
    /// Returns the leaf file indices whose stored state actually
    /// flipped, for the minimal set-back call to the remote source.
    pub fn set_wanted(&mut self, ids: &[NodeId], wanted: bool) -> BTreeSet<i32> {
        let mut flipped = BTreeSet::new();
        let mut touched = Vec::new();

        for &id in ids {
            self.set_subtree_wanted(id, wanted, &mut flipped, &mut touched);
        }

        let mut dirs = BTreeSet::new();

        for &node in &touched {
            if self.nodes[node].is_leaf() {
                self.emit_range(node, COL_WANTED, COL_WANTED);
            } else if node != ROOT {
                dirs.insert(node);
            }

            self.collect_ancestors(node, &mut dirs);
        }

        // a directory's rendered size, progress, and wanted state are
        // all derived from the flipped leaves
        for dir in dirs {
            self.emit_range(dir, COL_SIZE, COL_WANTED);
        }

        flipped
    }

    /// Analogous to [`set_wanted`](Self::set_wanted) for priority.
    pub fn set_priority(&mut self, ids: &[NodeId], priority: Priority) -> BTreeSet<i32> {
        let mut flipped = BTreeSet::new();
        let mut touched = Vec::new();

        for &id in ids {
            self.set_subtree_priority(id, priority, &mut flipped, &mut touched);
        }

        let mut dirs = BTreeSet::new();

        for &node in &touched {
            if self.nodes[node].is_leaf() {
                self.emit_range(node, COL_PRIORITY, COL_PRIORITY);
            } else if node != ROOT {
                dirs.insert(node);
            }

            self.collect_ancestors(node, &mut dirs);
        }

        for dir in dirs {
            self.emit_range(dir, COL_PRIORITY, COL_PRIORITY);
        }

        flipped
    }

    /// Tri-state wanted aggregate: `Yes` iff all leaf descendants are
    /// wanted, `No` iff none are, else `Mixed`.
    pub fn subtree_wanted(&self, id: NodeId) -> Wanted {
        let node = &self.nodes[id];

        if node.children.is_empty() {
            return Wanted::from(node.wanted);
        }

        let mut aggregate = None;

        for &child in &node.children {
            let wanted = self.subtree_wanted(child);

            if wanted == Wanted::Mixed {
                return Wanted::Mixed;
            }

            match aggregate {
                None => aggregate = Some(wanted),
                Some(prior) if prior != wanted => return Wanted::Mixed,
                Some(_) => {}
            }
        }

        aggregate.unwrap_or(Wanted::Yes)
    }

    /// Uniform priority of the subtree, or `None` when descendants
    /// disagree.
    pub fn subtree_priority(&self, id: NodeId) -> Option<Priority> {
        let node = &self.nodes[id];

        if node.children.is_empty() {
            return Some(node.priority);
        }

        let mut aggregate = None;

        for &child in &node.children {
            match (aggregate, self.subtree_priority(child)?) {
                (None, p) => aggregate = Some(p),
                (Some(prior), p) if prior != p => return None,
                _ => {}
            }
        }

        aggregate
    }

    /// (have, total) byte sums over the wanted descendants only;
    /// unwanted files do not count toward completion.
    pub fn wanted_sizes(&self, id: NodeId) -> (u64, u64) {
        let mut have = 0;
        let mut total = 0;
        self.accumulate_wanted(id, &mut have, &mut total);
        (have, total)
    }

    /// A leaf's own size, or the wanted total for a directory.
    pub fn size(&self, id: NodeId) -> u64 {
        let node = &self.nodes[id];

        if node.children.is_empty() {
            node.total_size
        } else {
            self.wanted_sizes(id).1
        }
    }

    pub fn progress(&self, id: NodeId) -> f64 {
        let (have, total) = self.wanted_sizes(id);

        if total == 0 {
            0.0
        } else {
            have as f64 / total as f64
        }
    }

    pub fn is_complete(&self, id: NodeId) -> bool {
        let node = &self.nodes[id];

        if node.is_leaf() {
            node.have_size == node.total_size
        } else {
            let (have, total) = self.wanted_sizes(id);
            have == total
        }
    }

    /// Resolves a slash-joined path to a node. The empty path is the
    /// root. Lookup is by exact name equality, no case folding.
    pub fn node(&self, path: &str) -> Option<NodeId> {
        if path.is_empty() {
            return Some(ROOT);
        }

        let mut cur = ROOT;

        for segment in path.split('/') {
            cur = self.find_child(cur, segment)?;
        }

        Some(cur)
    }

    /// Slash-joined path of a node from the (unnamed) root.
    pub fn node_path(&self, id: NodeId) -> String {
        let mut parts = Vec::new();
        let mut cur = id;

        while cur != ROOT {
            parts.push(self.nodes[cur].name.as_str());

            match self.nodes[cur].parent {
                Some(parent) => cur = parent,
                None => break,
            }
        }

        parts.reverse();
        parts.join("/")
    }

    pub fn find_file(&self, file_index: i32) -> Option<NodeId> {
        self.index_cache.get(&file_index).copied()
    }

    pub fn name(&self, id: NodeId) -> &str {
        &self.nodes[id].name
    }

    pub fn file_index(&self, id: NodeId) -> Option<i32> {
        self.nodes[id].file_index
    }

    pub fn is_leaf(&self, id: NodeId) -> bool {
        self.nodes[id].is_leaf()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].parent
    }

    pub fn child_count(&self, id: NodeId) -> usize {
        self.nodes[id].children.len()
    }

    pub fn child_at(&self, id: NodeId, row: usize) -> Option<NodeId> {
        self.nodes[id].children.get(row).copied()
    }

    /// Row of a node within its parent.
    pub fn row_of(&self, id: NodeId) -> Option<usize> {
        let parent = self.nodes[id].parent?;
        self.nodes[parent].children.iter().position(|&c| c == id)
    }

    /// Takes the change notifications queued since the last drain.
    pub fn drain_events(&mut self) -> Vec<TreeEvent> {
        std::mem::take(&mut self.events)
    }

    fn accumulate_wanted(&self, id: NodeId, have: &mut u64, total: &mut u64) {
        let node = &self.nodes[id];

        if node.wanted {
            *have += node.have_size;
            *total += node.total_size;
        }

        for &child in &node.children {
            self.accumulate_wanted(child, have, total);
        }
    }

    fn set_subtree_wanted(
        &mut self,
        id: NodeId,
        wanted: bool,
        flipped: &mut BTreeSet<i32>,
        touched: &mut Vec<NodeId>,
    ) {
        let node = &mut self.nodes[id];

        if node.wanted != wanted {
            node.wanted = wanted;
            touched.push(id);

            if let Some(index) = node.file_index {
                flipped.insert(index);
            }
        }

        let children = self.nodes[id].children.clone();

        for child in children {
            self.set_subtree_wanted(child, wanted, flipped, touched);
        }
    }

    fn set_subtree_priority(
        &mut self,
        id: NodeId,
        priority: Priority,
        flipped: &mut BTreeSet<i32>,
        touched: &mut Vec<NodeId>,
    ) {
        let node = &mut self.nodes[id];

        if node.priority != priority {
            node.priority = priority;
            touched.push(id);

            if let Some(index) = node.file_index {
                flipped.insert(index);
            }
        }

        let children = self.nodes[id].children.clone();

        for child in children {
            self.set_subtree_priority(child, priority, flipped, touched);
        }
    }

    fn update_leaf(
        &mut self,
        id: NodeId,
        wanted: bool,
        priority: Priority,
        have: u64,
        bulk_refresh: bool,
    ) -> Option<(usize, usize)> {
        let node = &mut self.nodes[id];

        // a directory sitting where the manifest claims a file lives
        // is a malformed entry; leave it alone
        if !node.is_leaf() {
            return None;
        }

        let mut changed: Vec<usize> = Vec::new();

        if node.have_size != have {
            node.have_size = have;
            changed.push(COL_PROGRESS);
        }

        if bulk_refresh {
            if node.wanted != wanted {
                node.wanted = wanted;
                changed.push(COL_WANTED);
            }

            if node.priority != priority {
                node.priority = priority;
                changed.push(COL_PRIORITY);
            }
        }

        // pushed in ascending column order
        match (changed.first(), changed.last()) {
            (Some(&first), Some(&last)) => Some((first, last)),
            _ => None,
        }
    }

    fn append_child(&mut self, parent: NodeId, mut node: FileNode) -> NodeId {
        node.parent = Some(parent);

        let id = self.nodes.len();
        self.nodes.push(node);

        let row = self.nodes[parent].children.len();
        self.nodes[parent].children.push(id);

        let parent_path = self.node_path(parent);
        self.events.push(TreeEvent::NodeInserted {
            parent: parent_path,
            row,
        });

        id
    }

    fn remove_subtree(&mut self, id: NodeId) {
        let children = self.nodes[id].children.clone();

        for &child in children.iter().rev() {
            self.remove_subtree(child);
        }

        let Some(parent) = self.nodes[id].parent else {
            return;
        };
        let Some(row) = self.nodes[parent].children.iter().position(|&c| c == id) else {
            return;
        };

        self.nodes[parent].children.remove(row);

        let name = self.nodes[id].name.clone();
        let parent_node = &mut self.nodes[parent];
        parent_node.child_rows.remove(&name);
        // rows from here on shifted; the cache is rebuilt lazily
        parent_node.first_unhashed_row = parent_node.first_unhashed_row.min(row);

        let parent_path = self.node_path(parent);
        self.events.push(TreeEvent::NodeRemoved {
            parent: parent_path,
            row,
        });
    }

    /// Keyed child lookup on the hot (mutation) path: re-hashes the
    /// dirty tail of the row cache before answering.
    fn child_named(&mut self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.hash_children(parent);

        let node = &self.nodes[parent];
        node.child_rows.get(name).map(|&row| node.children[row])
    }

    fn hash_children(&mut self, parent: NodeId) {
        let start = self.nodes[parent].first_unhashed_row;

        if start >= self.nodes[parent].children.len() {
            return;
        }

        let pending: Vec<(String, usize)> = self.nodes[parent].children[start..]
            .iter()
            .enumerate()
            .map(|(offset, &child)| (self.nodes[child].name.clone(), start + offset))
            .collect();

        let node = &mut self.nodes[parent];

        for (name, row) in pending {
            node.child_rows.insert(name, row);
        }

        node.first_unhashed_row = node.children.len();
    }

    /// Read-only child lookup: trusts the clean part of the cache and
    /// scans the dirty tail without rebuilding it.
    fn find_child(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        let node = &self.nodes[parent];

        if let Some(&row) = node.child_rows.get(name) {
            if row < node.first_unhashed_row {
                return Some(node.children[row]);
            }
        }

        node.children[node.first_unhashed_row.min(node.children.len())..]
            .iter()
            .copied()
            .find(|&child| self.nodes[child].name == name)
    }

    fn collect_ancestors(&self, id: NodeId, out: &mut BTreeSet<NodeId>) {
        let mut cur = self.nodes[id].parent;

        while let Some(ancestor) = cur {
            if ancestor != ROOT {
                out.insert(ancestor);
            }

            cur = self.nodes[ancestor].parent;
        }
    }

    fn emit_range(&mut self, id: NodeId, first_col: usize, last_col: usize) {
        let node = self.node_path(id);
        self.events.push(TreeEvent::NodeRangeChanged {
            node,
            first_col,
            last_col,
        });
    }

    fn emit_parents_range(&mut self, id: NodeId, first_col: usize, last_col: usize) {
        let mut ancestors = BTreeSet::new();
        self.collect_ancestors(id, &mut ancestors);

        for ancestor in ancestors {
            self.emit_range(ancestor, first_col, last_col);
        }
    }
}
