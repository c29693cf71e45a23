use std::cell::RefCell;
use std::rc::Rc;

use widget_core::{
    Builder, Clicked, ContextKey, EventStorage, HasEvent, MemoryScene, StatefulWidget, Template,
    Widget, WidgetChild, WidgetError, WidgetId, WidgetTree,
};
use widget_runtime_std::StdRuntime;

const MAX_FRAMES_PER_STEP: usize = 16;

#[derive(Clone, Debug, PartialEq)]
struct Todo {
    id: i64,
    title: String,
}

impl Todo {
    fn new(id: i64, title: &str) -> Self {
        Self {
            id,
            title: title.to_owned(),
        }
    }
}

#[derive(Clone, Default)]
struct Text {
    text: String,
}

impl Widget for Text {
    fn reset_state(&mut self) {
        self.text.clear();
    }
}

impl StatefulWidget for Text {
    type State = String;

    fn state(&self) -> &String {
        &self.text
    }

    fn state_mut(&mut self) -> &mut String {
        &mut self.text
    }
}

/// A todo row that fades out over a few frames before it goes back to the
/// pool.
#[derive(Clone, Default)]
struct TodoRow {
    title: String,
    fade_frames: u32,
    faded: u32,
}

impl Widget for TodoRow {
    fn refresh(&mut self, builder: &mut Builder<'_>) {
        if let Some(text) = builder.widget::<Text>(ContextKey::none()) {
            builder.set_state(&text, self.title.clone());
        }
    }

    fn try_to_release(&mut self) -> bool {
        if self.faded >= self.fade_frames {
            return true;
        }
        self.faded += 1;
        log::info!("'{}' fading {}/{}", self.title, self.faded, self.fade_frames);
        false
    }

    fn reset_state(&mut self) {
        self.title.clear();
        self.faded = 0;
    }
}

impl StatefulWidget for TodoRow {
    type State = String;

    fn state(&self) -> &String {
        &self.title
    }

    fn state_mut(&mut self) -> &mut String {
        &mut self.title
    }
}

#[derive(Clone, Default)]
struct ClearButton {
    clicked: EventStorage<Clicked>,
}

impl Widget for ClearButton {
    fn reset_state(&mut self) {
        self.clicked.clear();
    }
}

impl HasEvent<Clicked> for ClearButton {
    fn events(&self) -> &EventStorage<Clicked> {
        &self.clicked
    }

    fn events_mut(&mut self) -> &mut EventStorage<Clicked> {
        &mut self.clicked
    }
}

#[derive(Clone, Default)]
struct TodoList {
    row_template: Option<WidgetId>,
    todos: Vec<Todo>,
    clear: Option<WidgetChild<ClearButton>>,
}

impl Widget for TodoList {
    fn refresh(&mut self, builder: &mut Builder<'_>) {
        self.clear = builder.widget::<ClearButton>(ContextKey::none());
        if let Some(clear) = self.clear {
            if builder.tree().has_event::<ClearButton, Clicked>(clear.widget) {
                log::info!("clear clicked, dropping {} todos", self.todos.len());
                self.todos.clear();
            }
        }

        let template = match self.row_template {
            Some(id) => Template::root(id),
            None => Template::of(),
        };
        for todo in &self.todos {
            if let Some(row) = builder.declare::<TodoRow>(template, ContextKey::id(todo.id)) {
                builder.set_state(&row, todo.title.clone());
            }
        }
    }
}

impl StatefulWidget for TodoList {
    type State = Vec<Todo>;

    fn state(&self) -> &Vec<Todo> {
        &self.todos
    }

    fn state_mut(&mut self) -> &mut Vec<Todo> {
        &mut self.todos
    }
}

struct Demo {
    runtime: StdRuntime,
    scene: Rc<RefCell<MemoryScene>>,
    root: WidgetId,
}

impl Demo {
    fn new() -> Self {
        let scene = Rc::new(RefCell::new(MemoryScene::new()));
        let mut runtime = StdRuntime::from_tree(WidgetTree::new().with_scene(Rc::clone(&scene)));
        let row_template = runtime.tree_mut().create_archetype(TodoRow {
            fade_frames: 2,
            ..TodoRow::default()
        });
        let root = runtime.tree_mut().spawn_root(TodoList {
            row_template: Some(row_template),
            ..TodoList::default()
        });
        Self {
            runtime,
            scene,
            root,
        }
    }

    fn set_todos(&mut self, todos: Vec<Todo>) -> Result<(), WidgetError> {
        self.runtime
            .tree_mut()
            .set_state::<TodoList>(self.root, todos, false)?;
        Ok(())
    }

    fn click_clear(&mut self) -> Result<(), WidgetError> {
        let button = self
            .runtime
            .tree()
            .with_widget::<TodoList, _>(self.root, |list| list.clear)?;
        let Some(button) = button else {
            return Ok(());
        };
        let click = Clicked::this_frame(self.runtime.tree());
        self.runtime
            .tree_mut()
            .set_event::<ClearButton, Clicked>(button.widget, click)
    }

    fn step(&mut self, title: &str) {
        println!("--- {title} ---");
        let frames = self.runtime.run_until_idle(MAX_FRAMES_PER_STEP);
        let host = self.runtime.tree().host(self.root);
        println!(
            "frames: {frames}, pooled: {}",
            self.runtime.tree().total_pooled()
        );
        print!("{}", self.scene.borrow().dump_tree(host));
        println!();
    }
}

fn main() -> Result<(), WidgetError> {
    env_logger::init();

    println!("=== Widget Tree Demo ===");
    println!("A keyed todo list whose removed rows fade out before pooling.");
    println!();

    let mut demo = Demo::new();
    demo.step("empty list");

    demo.set_todos(vec![
        Todo::new(1, "write docs"),
        Todo::new(2, "review patch"),
        Todo::new(3, "ship release"),
    ])?;
    demo.step("three todos");

    demo.set_todos(vec![Todo::new(3, "ship release"), Todo::new(1, "write docs")])?;
    demo.step("reordered, one removed");

    demo.set_todos(vec![
        Todo::new(3, "ship release"),
        Todo::new(1, "write docs"),
        Todo::new(4, "plan next sprint"),
    ])?;
    demo.step("added a todo from the pool");

    demo.click_clear()?;
    demo.step("cleared");

    println!("widget tree:");
    print!("{}", demo.runtime.tree().dump_tree(demo.root));
    Ok(())
}
