//! Stateful tmux stand-in for manager and server tests.
//!
//! Tracks pane geometry well enough for splits and kills to show up in the
//! next `list-panes`. Layout commands are accepted and ignored.

use std::sync::{Arc, Mutex};

use panealloc_tmux::{TmuxCommandRunner, TmuxError};

#[derive(Debug, Clone)]
struct FakePane {
    id: String,
    width: u32,
    height: u32,
    left: u32,
    top: u32,
    title: String,
}

#[derive(Debug, Default)]
struct FakeState {
    window_width: u32,
    window_height: u32,
    panes: Vec<FakePane>,
    next_id: u32,
    calls: Vec<Vec<String>>,
    fail_list: bool,
    fail_split: bool,
}

pub(crate) struct FakeTmux {
    state: Mutex<FakeState>,
}

impl FakeTmux {
    /// A window holding only the main pane `%0`.
    pub(crate) fn new(width: u32, height: u32) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(FakeState {
                window_width: width,
                window_height: height,
                panes: vec![FakePane {
                    id: "%0".to_string(),
                    width,
                    height,
                    left: 0,
                    top: 0,
                    title: "main".to_string(),
                }],
                next_id: 1,
                ..FakeState::default()
            }),
        })
    }

    /// Resize the window. Only meaningful while the main pane is alone.
    pub(crate) fn set_window_width(&self, width: u32) {
        let mut st = self.state.lock().expect("fake lock");
        st.window_width = width;
        if st.panes.len() == 1 {
            st.panes[0].width = width;
        }
    }

    pub(crate) fn fail_snapshots(&self, fail: bool) {
        self.state.lock().expect("fake lock").fail_list = fail;
    }

    pub(crate) fn fail_splits(&self, fail: bool) {
        self.state.lock().expect("fake lock").fail_split = fail;
    }

    /// Remove a pane behind the manager's back.
    pub(crate) fn kill_externally(&self, pane_id: &str) {
        let mut st = self.state.lock().expect("fake lock");
        remove_pane(&mut st, pane_id);
    }

    pub(crate) fn pane_ids(&self) -> Vec<String> {
        let st = self.state.lock().expect("fake lock");
        st.panes.iter().map(|p| p.id.clone()).collect()
    }

    pub(crate) fn title_of(&self, pane_id: &str) -> Option<String> {
        let st = self.state.lock().expect("fake lock");
        st.panes.iter().find(|p| p.id == pane_id).map(|p| p.title.clone())
    }

    pub(crate) fn count(&self, command: &str) -> usize {
        let st = self.state.lock().expect("fake lock");
        st.calls.iter().filter(|c| c[0] == command).count()
    }

    pub(crate) fn kill_targets(&self) -> Vec<String> {
        let st = self.state.lock().expect("fake lock");
        st.calls
            .iter()
            .filter(|c| c[0] == "kill-pane")
            .filter_map(|c| flag_value(c, "-t"))
            .collect()
    }
}

fn flag_value(args: &[String], flag: &str) -> Option<String> {
    let at = args.iter().position(|a| a == flag)?;
    args.get(at + 1).cloned()
}

fn remove_pane(st: &mut FakeState, pane_id: &str) -> bool {
    let Some(at) = st.panes.iter().position(|p| p.id == pane_id) else {
        return false;
    };
    let gone = st.panes.remove(at);
    let same_row = |p: &FakePane| p.top == gone.top && p.height == gone.height;
    let same_column = |p: &FakePane| p.left == gone.left && p.width == gone.width;

    if let Some(p) = st
        .panes
        .iter_mut()
        .find(|p| same_row(p) && p.left + p.width + 1 == gone.left)
    {
        p.width += gone.width + 1;
    } else if let Some(p) = st
        .panes
        .iter_mut()
        .find(|p| same_column(p) && p.top + p.height + 1 == gone.top)
    {
        p.height += gone.height + 1;
    } else if let Some(p) = st
        .panes
        .iter_mut()
        .find(|p| same_row(p) && p.left == gone.left + gone.width + 1)
    {
        p.left = gone.left;
        p.width += gone.width + 1;
    } else if let Some(p) = st
        .panes
        .iter_mut()
        .find(|p| same_column(p) && p.top == gone.top + gone.height + 1)
    {
        p.top = gone.top;
        p.height += gone.height + 1;
    }
    true
}

impl TmuxCommandRunner for FakeTmux {
    fn run(&self, args: &[&str]) -> Result<String, TmuxError> {
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        let mut st = self.state.lock().expect("fake lock");
        st.calls.push(args.clone());
        let target = flag_value(&args, "-t").unwrap_or_default();
        let missing = || TmuxError::CommandFailed(format!("can't find pane: {target}"));

        match args[0].as_str() {
            "list-panes" => {
                if st.fail_list {
                    return Err(TmuxError::CommandFailed("no server running".into()));
                }
                let rows: Vec<String> = st
                    .panes
                    .iter()
                    .map(|p| {
                        format!(
                            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
                            p.id,
                            p.width,
                            p.height,
                            p.left,
                            p.top,
                            u8::from(p.id == "%0"),
                            st.window_width,
                            st.window_height,
                            p.title
                        )
                    })
                    .collect();
                Ok(rows.join("\n") + "\n")
            }
            "split-window" => {
                if st.fail_split {
                    return Err(TmuxError::CommandFailed("no space for new pane".into()));
                }
                let horizontal = args[1] == "-h";
                let id = format!("%{}", st.next_id);
                let pane = st
                    .panes
                    .iter_mut()
                    .find(|p| p.id == target)
                    .ok_or_else(missing)?;
                let new_pane = if horizontal {
                    let kept = (pane.width - 1) / 2;
                    let new_pane = FakePane {
                        id: id.clone(),
                        width: pane.width - kept - 1,
                        height: pane.height,
                        left: pane.left + kept + 1,
                        top: pane.top,
                        title: String::new(),
                    };
                    pane.width = kept;
                    new_pane
                } else {
                    let kept = (pane.height - 1) / 2;
                    let new_pane = FakePane {
                        id: id.clone(),
                        width: pane.width,
                        height: pane.height - kept - 1,
                        left: pane.left,
                        top: pane.top + kept + 1,
                        title: String::new(),
                    };
                    pane.height = kept;
                    new_pane
                };
                st.panes.push(new_pane);
                st.next_id += 1;
                Ok(format!("{id}\n"))
            }
            "select-pane" => {
                let title = flag_value(&args, "-T").unwrap_or_default();
                let pane = st
                    .panes
                    .iter_mut()
                    .find(|p| p.id == target)
                    .ok_or_else(missing)?;
                pane.title = title;
                Ok(String::new())
            }
            "send-keys" | "respawn-pane" => {
                if st.panes.iter().any(|p| p.id == target) {
                    Ok(String::new())
                } else {
                    Err(missing())
                }
            }
            "kill-pane" => {
                if remove_pane(&mut st, &target) {
                    Ok(String::new())
                } else {
                    Err(missing())
                }
            }
            "set-window-option" | "select-layout" | "resize-pane" => Ok(String::new()),
            other => Err(TmuxError::CommandFailed(format!("unknown command: {other}"))),
        }
    }
}
