use todofold::drag::{DragSnapshot, Point, Region};
use todofold::reconcile::{Board, MoveOutcome, submit_commit};
use todofold::{
    Category, CategoryTarget, Commit, Database, DragTracker, DropRegions, DropTarget, ReassignError, Todo, User,
    reassign_todo,
};

struct Fixture {
    db: Database,
    alice: User,
    bob: User,
}

fn fixture() -> Fixture {
    let db = Database::open_in_memory().expect("Failed to open test DB");
    let alice = db.ensure_user("alice").unwrap();
    let bob = db.ensure_user("bob").unwrap();
    Fixture { db, alice, bob }
}

fn category(db: &Database, user: &User, name: &str) -> i64 {
    db.insert_category(&Category::new(user.id, name.to_string())).unwrap()
}

fn todo(db: &Database, user: &User, title: &str, category_id: Option<i64>) -> i64 {
    let mut todo = Todo::new(user.id, title.to_string());
    todo.category_id = category_id;
    db.insert_todo(&todo).unwrap()
}

/// Two folders stacked at the top of the screen
fn folder_regions(first: i64, second: i64) -> DropRegions {
    let mut regions = DropRegions::new();
    regions.register(Region::new(0, 0, 20, 1), DropTarget::Category(first));
    regions.register(Region::new(0, 1, 20, 1), DropTarget::Category(second));
    regions
}

fn drag_and_release(board: &Board, todo_id: i64, to: Point, regions: &DropRegions) -> Option<Commit> {
    let snapshot = DragSnapshot::of(board.todo(todo_id).unwrap()).unwrap();
    let mut tracker = DragTracker::new();
    assert!(tracker.press(snapshot, Point::new(30, 10), regions).is_none());
    tracker.pointer_moved(Point::new(25, 5), regions);
    tracker.pointer_moved(to, regions);
    let commit = tracker.release(to, regions);
    assert!(!tracker.is_dragging());
    commit
}

#[test]
fn uncategorized_todo_dropped_on_a_folder_joins_it() {
    let Fixture { db, alice, .. } = fixture();
    let c1 = category(&db, &alice, "Work");
    let c2 = category(&db, &alice, "Home");
    let t1 = todo(&db, &alice, "t1", None);
    let mut board = Board::load(&db, alice.id).unwrap();

    let commit = drag_and_release(&board, t1, Point::new(3, 0), &folder_regions(c1, c2)).unwrap();
    assert_eq!(commit, Commit { todo_id: t1, target: CategoryTarget::Category { id: c1 } });

    assert!(matches!(submit_commit(&db, alice.id, &mut board, &commit), MoveOutcome::Moved(_)));
    assert_eq!(db.find_todo_by_id(t1, alice.id).unwrap().unwrap().category_id, Some(c1));
    assert_eq!(board.category(c1).unwrap().todo_count, 1);
}

#[test]
fn todo_released_over_empty_space_leaves_its_folder() {
    let Fixture { db, alice, .. } = fixture();
    let c1 = category(&db, &alice, "Work");
    let c2 = category(&db, &alice, "Home");
    let t2 = todo(&db, &alice, "t2", Some(c1));
    let mut board = Board::load(&db, alice.id).unwrap();

    let commit = drag_and_release(&board, t2, Point::new(50, 20), &folder_regions(c1, c2)).unwrap();
    assert_eq!(commit.target, CategoryTarget::None);
    assert_eq!(
        commit.action().to_form(),
        format!("_action=updateCategory&todoId={}&categoryId=null", t2)
    );

    assert!(matches!(submit_commit(&db, alice.id, &mut board, &commit), MoveOutcome::Moved(_)));
    assert_eq!(db.find_todo_by_id(t2, alice.id).unwrap().unwrap().category_id, None);
    assert_eq!(board.category(c1).unwrap().todo_count, 0);
}

#[test]
fn another_users_todo_cannot_be_moved() {
    let Fixture { db, alice, bob } = fixture();
    let c_alice = category(&db, &alice, "Work");
    let c_bob = category(&db, &bob, "Mine");
    let t3 = todo(&db, &alice, "t3", Some(c_alice));

    for target in [CategoryTarget::Category { id: c_bob }, CategoryTarget::Category { id: c_alice }, CategoryTarget::None] {
        let err = reassign_todo(&db, bob.id, t3, target).unwrap_err();
        assert!(matches!(err, ReassignError::NotFound(_)), "{:?}", err);
    }
    assert_eq!(db.find_todo_by_id(t3, alice.id).unwrap().unwrap().category_id, Some(c_alice));
}

#[test]
fn another_users_category_is_not_a_destination() {
    let Fixture { db, alice, bob } = fixture();
    let c_bob = category(&db, &bob, "Mine");
    let t = todo(&db, &alice, "t", None);

    let err = reassign_todo(&db, alice.id, t, CategoryTarget::Category { id: c_bob }).unwrap_err();
    assert!(matches!(err, ReassignError::NotFound(_)));
    assert_eq!(db.find_todo_by_id(t, alice.id).unwrap().unwrap().category_id, None);
}

#[test]
fn folder_deleted_before_the_commit_lands_reverts_the_board() {
    let Fixture { db, alice, .. } = fixture();
    let c1 = category(&db, &alice, "Work");
    let c2 = category(&db, &alice, "Old");
    let t4 = todo(&db, &alice, "t4", Some(c1));
    let mut board = Board::load(&db, alice.id).unwrap();

    let commit = drag_and_release(&board, t4, Point::new(3, 1), &folder_regions(c1, c2)).unwrap();
    assert!(db.delete_category(c2, alice.id).unwrap());

    let outcome = submit_commit(&db, alice.id, &mut board, &commit);
    assert!(matches!(outcome, MoveOutcome::Rejected(_)), "{:?}", outcome);
    assert_eq!(board.todo(t4).unwrap().category_id, Some(c1));
    assert_eq!(board.category(c1).unwrap().todo_count, 1);
    assert_eq!(db.find_todo_by_id(t4, alice.id).unwrap().unwrap().category_id, Some(c1));
}

#[test]
fn repeating_a_move_changes_nothing_further() {
    let Fixture { db, alice, .. } = fixture();
    let c1 = category(&db, &alice, "Work");
    let t = todo(&db, &alice, "t", None);

    let once = reassign_todo(&db, alice.id, t, CategoryTarget::Category { id: c1 }).unwrap();
    let twice = reassign_todo(&db, alice.id, t, CategoryTarget::Category { id: c1 }).unwrap();
    assert_eq!(once.category_id, twice.category_id);
    assert_eq!(once.title, twice.title);
    assert_eq!(db.get_categories(alice.id).unwrap()[0].todo_count, 1);

    let uncategorized = todo(&db, &alice, "u", None);
    let cleared = reassign_todo(&db, alice.id, uncategorized, CategoryTarget::None).unwrap();
    assert_eq!(cleared.category_id, None);
}
