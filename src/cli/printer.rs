use colored::Colorize;
use supports_color::Stream;

use dirindex::index::{Address, EntryInfo, FsTree, IndexError, TreeObserver};

/// Renders an index as an indented listing.
pub struct TreePrinter {
    colored: bool,
}

impl TreePrinter {
    /// Colors directories when stdout supports it.
    pub fn for_stdout() -> Self {
        Self {
            colored: supports_color::on(Stream::Stdout).is_some(),
        }
    }

    #[cfg(test)]
    pub fn plain() -> Self {
        Self { colored: false }
    }

    pub fn print(&self, tree: &mut FsTree, depth: usize) -> Result<(), IndexError> {
        for line in self.render(tree, depth)? {
            println!("{line}");
        }
        Ok(())
    }

    /// Lines for the root and `depth` levels below it. Directories within
    /// reach are enumerated as needed.
    pub fn render(&self, tree: &mut FsTree, depth: usize) -> Result<Vec<String>, IndexError> {
        let mut lines = vec![tree.root_path().display().to_string()];
        if depth > 0 {
            self.render_children(tree, Address::root(), 1, depth, &mut lines)?;
        }
        Ok(lines)
    }

    fn render_children(
        &self,
        tree: &mut FsTree,
        parent: Address,
        level: usize,
        depth: usize,
        lines: &mut Vec<String>,
    ) -> Result<(), IndexError> {
        let rows = tree.row_count(parent)?;
        for row in 0..rows {
            let address = tree.address_at(row, 0, parent)?;
            let info = tree.data(address)?;
            lines.push(format!("{}{}", "  ".repeat(level), self.label(&info)));
            if info.is_dir && level < depth {
                self.render_children(tree, address, level + 1, depth, lines)?;
            }
        }
        Ok(())
    }

    fn label(&self, info: &EntryInfo) -> String {
        match (info.is_dir, self.colored) {
            (true, true) => format!("{}/", info.label.blue().bold()),
            (true, false) => format!("{}/", info.label),
            (false, _) => info.label.clone(),
        }
    }
}

/// Observer that prints every notification it receives.
#[derive(Debug, Default)]
pub struct NotificationPrinter;

impl NotificationPrinter {
    fn describe_rows(tree: &FsTree, action: &str, parent: Address, first: usize, last: usize) -> String {
        let parent = tree
            .data(parent)
            .map(|info| info.path.display().to_string())
            .unwrap_or_else(|e| format!("<{e}>"));
        format!("{action} rows {first}..={last} under {parent}")
    }
}

impl TreeObserver for NotificationPrinter {
    fn begin_insert_rows(&mut self, tree: &FsTree, parent: Address, first: usize, last: usize) {
        println!("{}", Self::describe_rows(tree, "inserting", parent, first, last));
    }

    fn end_insert_rows(&mut self, _tree: &FsTree) {
        println!("rows inserted");
    }

    fn begin_remove_rows(&mut self, tree: &FsTree, parent: Address, first: usize, last: usize) {
        println!("{}", Self::describe_rows(tree, "removing", parent, first, last));
    }

    fn end_remove_rows(&mut self, _tree: &FsTree) {
        println!("rows removed");
    }

    fn data_changed(&mut self, tree: &FsTree, address: Address) {
        match tree.data(address) {
            Ok(info) => println!("changed {}", info.path.display()),
            Err(e) => println!("changed <{e}>"),
        }
    }
}
