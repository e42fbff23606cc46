//! Drag session tracking for moving todos between folders.
//!
//! The tracker is a small state machine fed with pointer positions. It knows
//! nothing about terminals or widgets: the renderer registers the folder
//! rectangles it drew for the current frame as [`DropRegions`] and hands
//! them in with every pointer event.

use tracing::debug;

use crate::actions::Action;
use crate::models::{CategoryTarget, Priority, Todo};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Point {
    pub x: u16,
    pub y: u16,
}

impl Point {
    pub fn new(x: u16, y: u16) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle in terminal cells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Region {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
}

impl Region {
    pub fn new(x: u16, y: u16, width: u16, height: u16) -> Self {
        Self { x, y, width, height }
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x
            && point.y >= self.y
            && u32::from(point.x) < u32::from(self.x) + u32::from(self.width)
            && u32::from(point.y) < u32::from(self.y) + u32::from(self.height)
    }

    pub fn area(&self) -> u32 {
        u32::from(self.width) * u32::from(self.height)
    }
}

impl From<ratatui::layout::Rect> for Region {
    fn from(rect: ratatui::layout::Rect) -> Self {
        Self::new(rect.x, rect.y, rect.width, rect.height)
    }
}

/// Something a todo can be dropped on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DropTarget {
    /// A category folder
    Category(i64),
    /// The back-navigation target shown inside a folder; dropping there takes
    /// the todo out of every category
    Back,
}

impl DropTarget {
    pub fn category_target(self) -> CategoryTarget {
        match self {
            DropTarget::Category(id) => CategoryTarget::Category { id },
            DropTarget::Back => CategoryTarget::None,
        }
    }
}

/// Drop-target regions registered for the frame currently on screen
#[derive(Debug, Clone, Default)]
pub struct DropRegions {
    regions: Vec<(Region, DropTarget)>,
}

impl DropRegions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.regions.clear();
    }

    /// Register a region; later registrations paint over earlier ones
    pub fn register(&mut self, region: Region, target: DropTarget) {
        if region.area() > 0 {
            self.regions.push((region, target));
        }
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Region, DropTarget)> {
        self.regions.iter()
    }

    /// The single target under `point`.
    ///
    /// Among overlapping regions the smallest (innermost) wins; equal areas
    /// go to the one registered last (topmost).
    pub fn resolve(&self, point: Point) -> Option<DropTarget> {
        self.regions
            .iter()
            .enumerate()
            .filter(|(_, (region, _))| region.contains(point))
            .min_by_key(|(order, (region, _))| (region.area(), std::cmp::Reverse(*order)))
            .map(|(_, (_, target))| *target)
    }
}

/// Display data captured when a drag starts, used to draw the overlay
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragSnapshot {
    pub todo_id: i64,
    pub title: String,
    pub priority: Priority,
    pub category_id: Option<i64>,
}

impl DragSnapshot {
    /// Snapshot of a stored todo; unsaved todos cannot be dragged
    pub fn of(todo: &Todo) -> Option<Self> {
        Some(Self {
            todo_id: todo.id?,
            title: todo.title.clone(),
            priority: todo.priority,
            category_id: todo.category_id,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DragState {
    #[default]
    Idle,
    Dragging {
        snapshot: DragSnapshot,
        pointer: Point,
    },
    DraggingOverTarget {
        snapshot: DragSnapshot,
        pointer: Point,
        target: DropTarget,
    },
}

/// The outcome of one finished gesture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Commit {
    pub todo_id: i64,
    pub target: CategoryTarget,
}

impl Commit {
    pub fn action(&self) -> Action {
        Action::UpdateCategory {
            todo_id: self.todo_id,
            target: self.target,
        }
    }
}

/// What the renderer needs to draw the detached copy of the dragged todo
#[derive(Debug, Clone, Copy)]
pub struct Overlay<'a> {
    pub snapshot: &'a DragSnapshot,
    pub pointer: Point,
    pub target: Option<DropTarget>,
}

#[derive(Debug, Default)]
pub struct DragTracker {
    state: DragState,
}

impl DragTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &DragState {
        &self.state
    }

    pub fn is_dragging(&self) -> bool {
        !matches!(self.state, DragState::Idle)
    }

    pub fn hovered_target(&self) -> Option<DropTarget> {
        match &self.state {
            DragState::DraggingOverTarget { target, .. } => Some(*target),
            _ => None,
        }
    }

    pub fn overlay(&self) -> Option<Overlay<'_>> {
        match &self.state {
            DragState::Idle => None,
            DragState::Dragging { snapshot, pointer } => Some(Overlay {
                snapshot,
                pointer: *pointer,
                target: None,
            }),
            DragState::DraggingOverTarget { snapshot, pointer, target } => Some(Overlay {
                snapshot,
                pointer: *pointer,
                target: Some(*target),
            }),
        }
    }

    /// Pointer pressed on the drag handle of `snapshot`'s todo.
    ///
    /// A press while a gesture is still open means its release was lost; that
    /// gesture is finished at `at` first and its commit returned.
    pub fn press(&mut self, snapshot: DragSnapshot, at: Point, regions: &DropRegions) -> Option<Commit> {
        let unfinished = if self.is_dragging() {
            debug!("press during an open drag, finishing it first");
            self.release(at, regions)
        } else {
            None
        };

        debug!(todo_id = snapshot.todo_id, "drag started");
        self.state = DragState::Dragging { snapshot, pointer: at };
        self.pointer_moved(at, regions);
        unfinished
    }

    /// Pointer moved; re-resolves the drop target under it
    pub fn pointer_moved(&mut self, at: Point, regions: &DropRegions) {
        let snapshot = match std::mem::take(&mut self.state) {
            DragState::Idle => return,
            DragState::Dragging { snapshot, .. } | DragState::DraggingOverTarget { snapshot, .. } => {
                snapshot
            }
        };

        self.state = match regions.resolve(at) {
            Some(target) => DragState::DraggingOverTarget { snapshot, pointer: at, target },
            None => DragState::Dragging { snapshot, pointer: at },
        };
    }

    /// Pointer released. Always leaves the tracker idle.
    ///
    /// Released over a folder the todo goes there; released over the back
    /// target or over nothing it leaves every folder. Dropping a todo onto
    /// the folder it is already in produces no commit.
    pub fn release(&mut self, at: Point, regions: &DropRegions) -> Option<Commit> {
        self.pointer_moved(at, regions);

        let (snapshot, target) = match std::mem::take(&mut self.state) {
            DragState::Idle => return None,
            DragState::Dragging { snapshot, .. } => (snapshot, CategoryTarget::None),
            DragState::DraggingOverTarget { snapshot, target, .. } => {
                (snapshot, target.category_target())
            }
        };

        if let CategoryTarget::Category { id } = target {
            if snapshot.category_id == Some(id) {
                debug!(todo_id = snapshot.todo_id, category_id = id, "dropped on own folder");
                return None;
            }
        }

        debug!(todo_id = snapshot.todo_id, destination = %target, "drag committed");
        Some(Commit {
            todo_id: snapshot.todo_id,
            target,
        })
    }

    /// Abandon the gesture without committing anything
    pub fn cancel(&mut self) {
        if self.is_dragging() {
            debug!("drag cancelled");
        }
        self.state = DragState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(todo_id: i64, category_id: Option<i64>) -> DragSnapshot {
        DragSnapshot {
            todo_id,
            title: format!("todo {todo_id}"),
            priority: Priority::Medium,
            category_id,
        }
    }

    /// Two folders side by side and a back target above them
    fn regions() -> DropRegions {
        let mut regions = DropRegions::new();
        regions.register(Region::new(0, 0, 20, 1), DropTarget::Back);
        regions.register(Region::new(0, 2, 10, 3), DropTarget::Category(1));
        regions.register(Region::new(10, 2, 10, 3), DropTarget::Category(2));
        regions
    }

    #[test]
    fn region_contains_is_half_open() {
        let region = Region::new(2, 2, 3, 2);
        assert!(region.contains(Point::new(2, 2)));
        assert!(region.contains(Point::new(4, 3)));
        assert!(!region.contains(Point::new(5, 3)));
        assert!(!region.contains(Point::new(4, 4)));
        assert!(!Region::new(0, 0, 0, 5).contains(Point::new(0, 0)));
    }

    #[test]
    fn region_at_screen_edge_does_not_overflow() {
        let region = Region::new(u16::MAX - 1, 0, 5, 1);
        assert!(region.contains(Point::new(u16::MAX, 0)));
    }

    #[test]
    fn innermost_region_wins() {
        let mut regions = DropRegions::new();
        regions.register(Region::new(0, 0, 30, 10), DropTarget::Category(1));
        regions.register(Region::new(5, 2, 5, 3), DropTarget::Category(2));
        assert_eq!(regions.resolve(Point::new(6, 3)), Some(DropTarget::Category(2)));
        assert_eq!(regions.resolve(Point::new(20, 8)), Some(DropTarget::Category(1)));
        assert_eq!(regions.resolve(Point::new(40, 8)), None);
    }

    #[test]
    fn equal_overlap_goes_to_topmost() {
        let mut regions = DropRegions::new();
        regions.register(Region::new(0, 0, 10, 3), DropTarget::Category(1));
        regions.register(Region::new(0, 0, 10, 3), DropTarget::Category(2));
        assert_eq!(regions.resolve(Point::new(1, 1)), Some(DropTarget::Category(2)));
    }

    #[test]
    fn drop_on_folder_commits_that_folder() {
        let regions = regions();
        let mut tracker = DragTracker::new();

        assert_eq!(tracker.press(snapshot(1, None), Point::new(40, 10), &regions), None);
        assert!(matches!(tracker.state(), DragState::Dragging { .. }));

        tracker.pointer_moved(Point::new(3, 3), &regions);
        assert_eq!(tracker.hovered_target(), Some(DropTarget::Category(1)));

        let commit = tracker.release(Point::new(3, 3), &regions);
        assert_eq!(commit, Some(Commit { todo_id: 1, target: CategoryTarget::Category { id: 1 } }));
        assert_eq!(tracker.state(), &DragState::Idle);
    }

    #[test]
    fn drop_on_empty_space_uncategorizes() {
        let regions = regions();
        let mut tracker = DragTracker::new();

        tracker.press(snapshot(2, Some(1)), Point::new(40, 10), &regions);
        tracker.pointer_moved(Point::new(3, 3), &regions);
        tracker.pointer_moved(Point::new(50, 12), &regions);
        assert!(matches!(tracker.state(), DragState::Dragging { .. }));

        let commit = tracker.release(Point::new(50, 12), &regions);
        assert_eq!(commit, Some(Commit { todo_id: 2, target: CategoryTarget::None }));
        assert!(!tracker.is_dragging());
    }

    #[test]
    fn uncategorized_todo_dropped_on_nothing_still_commits() {
        let regions = regions();
        let mut tracker = DragTracker::new();
        tracker.press(snapshot(5, None), Point::new(40, 10), &regions);
        let commit = tracker.release(Point::new(40, 10), &regions);
        assert_eq!(commit, Some(Commit { todo_id: 5, target: CategoryTarget::None }));
    }

    #[test]
    fn back_target_uncategorizes() {
        let regions = regions();
        let mut tracker = DragTracker::new();
        tracker.press(snapshot(3, Some(2)), Point::new(40, 10), &regions);
        let commit = tracker.release(Point::new(5, 0), &regions);
        assert_eq!(commit, Some(Commit { todo_id: 3, target: CategoryTarget::None }));
    }

    #[test]
    fn dropping_on_own_folder_skips_commit() {
        let regions = regions();
        let mut tracker = DragTracker::new();
        tracker.press(snapshot(4, Some(2)), Point::new(40, 10), &regions);
        assert_eq!(tracker.release(Point::new(12, 3), &regions), None);
        assert_eq!(tracker.state(), &DragState::Idle);
    }

    #[test]
    fn release_resolves_target_at_release_point() {
        let regions = regions();
        let mut tracker = DragTracker::new();
        tracker.press(snapshot(1, None), Point::new(40, 10), &regions);
        // no move event between press and release
        let commit = tracker.release(Point::new(15, 4), &regions);
        assert_eq!(commit, Some(Commit { todo_id: 1, target: CategoryTarget::Category { id: 2 } }));
    }

    #[test]
    fn moving_between_folders_switches_target() {
        let regions = regions();
        let mut tracker = DragTracker::new();
        tracker.press(snapshot(1, None), Point::new(40, 10), &regions);
        tracker.pointer_moved(Point::new(3, 3), &regions);
        tracker.pointer_moved(Point::new(13, 3), &regions);
        assert_eq!(tracker.hovered_target(), Some(DropTarget::Category(2)));
    }

    #[test]
    fn overlay_follows_pointer_and_vanishes_on_release() {
        let regions = regions();
        let mut tracker = DragTracker::new();
        assert!(tracker.overlay().is_none());

        tracker.press(snapshot(1, None), Point::new(40, 10), &regions);
        tracker.pointer_moved(Point::new(3, 3), &regions);
        let overlay = tracker.overlay().expect("overlay while dragging");
        assert_eq!(overlay.pointer, Point::new(3, 3));
        assert_eq!(overlay.snapshot.title, "todo 1");
        assert_eq!(overlay.target, Some(DropTarget::Category(1)));

        tracker.release(Point::new(3, 3), &regions);
        assert!(tracker.overlay().is_none());
    }

    #[test]
    fn idle_moves_and_releases_are_ignored() {
        let regions = regions();
        let mut tracker = DragTracker::new();
        tracker.pointer_moved(Point::new(3, 3), &regions);
        assert_eq!(tracker.release(Point::new(3, 3), &regions), None);
        assert_eq!(tracker.state(), &DragState::Idle);
    }

    #[test]
    fn press_during_open_drag_finishes_previous_gesture() {
        let regions = regions();
        let mut tracker = DragTracker::new();
        tracker.press(snapshot(1, None), Point::new(40, 10), &regions);
        tracker.pointer_moved(Point::new(3, 3), &regions);

        let finished = tracker.press(snapshot(2, None), Point::new(3, 3), &regions);
        assert_eq!(finished, Some(Commit { todo_id: 1, target: CategoryTarget::Category { id: 1 } }));
        match tracker.state() {
            DragState::DraggingOverTarget { snapshot, .. } => assert_eq!(snapshot.todo_id, 2),
            other => panic!("expected a new drag, got {other:?}"),
        }
    }

    #[test]
    fn cancel_returns_to_idle_without_commit() {
        let regions = regions();
        let mut tracker = DragTracker::new();
        tracker.press(snapshot(1, None), Point::new(3, 3), &regions);
        tracker.cancel();
        assert_eq!(tracker.state(), &DragState::Idle);
        assert_eq!(tracker.release(Point::new(3, 3), &regions), None);
    }

    #[test]
    fn folder_disappearing_mid_drag_falls_back_to_no_target() {
        let mut regions = regions();
        let mut tracker = DragTracker::new();
        tracker.press(snapshot(1, None), Point::new(3, 3), &regions);
        assert_eq!(tracker.hovered_target(), Some(DropTarget::Category(1)));

        regions.clear();
        let commit = tracker.release(Point::new(3, 3), &regions);
        assert_eq!(commit, Some(Commit { todo_id: 1, target: CategoryTarget::None }));
    }

    #[test]
    fn commit_becomes_update_category_action() {
        let commit = Commit { todo_id: 7, target: CategoryTarget::None };
        assert_eq!(commit.action().to_form(), "_action=updateCategory&todoId=7&categoryId=null");
    }
}
