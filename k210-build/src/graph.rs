//! Build goals and the dependencies between them.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::convert::ArtifactConverter;
use crate::program::ProgramSources;
use crate::toolchain::ToolRole;
use crate::upload::UploadPlan;
use crate::{Action, BuildEnvironment, BuildError};

/// The goals that can be requested on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Goal {
    /// Build the firmware image.
    Buildprog,
    /// Use the firmware image from a previous build.
    Nobuild,
    /// Print section sizes of the program.
    Size,
    /// Program the board.
    Upload,
}

impl Goal {
    pub const ALL: [Goal; 4] = [Goal::Buildprog, Goal::Nobuild, Goal::Size, Goal::Upload];

    /// Goals built when none are requested.
    pub const DEFAULT: [Goal; 2] = [Goal::Buildprog, Goal::Size];

    pub fn name(&self) -> &'static str {
        match self {
            Goal::Buildprog => "buildprog",
            Goal::Nobuild => "nobuild",
            Goal::Size => "size",
            Goal::Upload => "upload",
        }
    }
}

impl fmt::Display for Goal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Goal {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Goal::ALL
            .into_iter()
            .find(|goal| goal.name() == s)
            .ok_or_else(|| {
                let known = Goal::ALL.map(|goal| goal.name()).join(", ");
                format!("Unknown target '{s}' (known targets: {known})")
            })
    }
}

/// Whether the program is compiled in this session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildMode {
    Compile,
    /// The artifacts of an earlier build are used as they are.
    NoBuild,
}

impl BuildMode {
    pub fn from_goals(goals: &[Goal]) -> Self {
        if goals.contains(&Goal::Nobuild) {
            BuildMode::NoBuild
        } else {
            BuildMode::Compile
        }
    }
}

/// A named node of the build graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetNode {
    pub name: String,
    pub actions: Vec<Action>,
    pub prerequisites: Vec<String>,
    /// Files the actions produce.
    pub outputs: Vec<PathBuf>,
    /// Files the actions read besides the outputs of prerequisites.
    pub sources: Vec<PathBuf>,
    /// Run the actions on every invocation, no matter how fresh the outputs are.
    pub always_build: bool,
}

impl TargetNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            actions: Vec::new(),
            prerequisites: Vec::new(),
            outputs: Vec::new(),
            sources: Vec::new(),
            always_build: false,
        }
    }

    /// A node standing for a file, named after its path.
    pub fn file(path: PathBuf) -> Self {
        let mut node = Self::new(path.display().to_string());
        node.outputs.push(path);
        node
    }

    pub fn action(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }

    pub fn actions(mut self, actions: impl IntoIterator<Item = Action>) -> Self {
        self.actions.extend(actions);
        self
    }

    pub fn depends_on(mut self, prerequisite: impl Into<String>) -> Self {
        self.prerequisites.push(prerequisite.into());
        self
    }

    pub fn sources(mut self, sources: impl IntoIterator<Item = PathBuf>) -> Self {
        self.sources.extend(sources);
        self
    }

    pub fn always_build(mut self) -> Self {
        self.always_build = true;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct TargetGraph {
    nodes: BTreeMap<String, TargetNode>,
}

impl TargetGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `node`, replacing a node of the same name.
    pub fn add(&mut self, node: TargetNode) {
        self.nodes.insert(node.name.clone(), node);
    }

    pub fn node(&self, name: &str) -> Option<&TargetNode> {
        self.nodes.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    /// Orders the nodes needed for `goals` so that every node comes after its
    /// prerequisites. Each node appears once.
    pub fn schedule<S: AsRef<str>>(&self, goals: &[S]) -> Result<Vec<&TargetNode>, BuildError> {
        let mut order = Vec::new();
        let mut done = HashSet::new();
        let mut visiting = HashSet::new();

        for goal in goals {
            self.visit(goal.as_ref(), &mut visiting, &mut done, &mut order)?;
        }

        Ok(order)
    }

    fn visit<'a>(
        &'a self,
        name: &str,
        visiting: &mut HashSet<&'a str>,
        done: &mut HashSet<&'a str>,
        order: &mut Vec<&'a TargetNode>,
    ) -> Result<(), BuildError> {
        let node = self
            .nodes
            .get(name)
            .ok_or_else(|| BuildError::UnknownTarget(name.to_owned()))?;

        if done.contains(node.name.as_str()) {
            return Ok(());
        }
        if !visiting.insert(node.name.as_str()) {
            return Err(BuildError::DependencyCycle(node.name.clone()));
        }

        for prerequisite in &node.prerequisites {
            self.visit(prerequisite, visiting, done, order)?;
        }

        visiting.remove(node.name.as_str());
        done.insert(node.name.as_str());
        order.push(node);

        Ok(())
    }
}

/// Builds the graph of the firmware goals.
///
/// In [`BuildMode::NoBuild`] the program and the firmware image have no
/// actions, they are expected to exist from an earlier build.
pub fn firmware_graph(
    env: &BuildEnvironment,
    mode: BuildMode,
    sources: &ProgramSources,
    upload: &UploadPlan,
) -> Result<TargetGraph, BuildError> {
    let elf_path = env.elf_path();
    let firmware_path = env.firmware_path();

    let mut elf = TargetNode::file(elf_path.clone());
    let mut firmware = TargetNode::file(firmware_path.clone());

    match mode {
        BuildMode::Compile => {
            let to_bin = env.converter(ArtifactConverter::ELF_TO_BIN.name)?;

            elf = elf
                .action(sources.link_action(env, &elf_path))
                .sources(sources.files().iter().cloned());
            firmware = firmware
                .action(to_bin.action(
                    env.toolchain().tool(ToolRole::ObjectCopy),
                    &elf_path,
                    &firmware_path,
                ))
                .depends_on(elf.name.clone());
        }
        BuildMode::NoBuild => {
            tracing::debug!("Skipping compilation, using {}", firmware_path.display());
        }
    }

    let size = TargetNode::new(Goal::Size.name())
        .depends_on(elf.name.clone())
        .action(Action::best_effort(
            format!("Calculating size {}", elf_path.display()),
            env.toolchain().size_command([elf_path.as_path()]),
        ))
        .always_build();

    let upload = TargetNode::new(Goal::Upload.name())
        .depends_on(firmware.name.clone())
        .actions(upload.actions.iter().cloned())
        .always_build();

    let buildprog = TargetNode::new(Goal::Buildprog.name()).depends_on(firmware.name.clone());

    let nobuild = TargetNode::new(Goal::Nobuild.name())
        .depends_on(firmware.name.clone())
        .always_build();

    let mut graph = TargetGraph::new();
    for node in [elf, firmware, buildprog, nobuild, size, upload] {
        graph.add(node);
    }
    Ok(graph)
}
