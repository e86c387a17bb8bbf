//! The compiled, immutable build plan

use std::fmt;

/// One of the four fixed build stages, in emission order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    Base,
    Galaxy,
    Builder,
    Final,
}

impl StageKind {
    pub const ALL: [StageKind; 4] = [
        StageKind::Base,
        StageKind::Galaxy,
        StageKind::Builder,
        StageKind::Final,
    ];

    /// Stage alias other stages refer to with `FROM` and `COPY --from`
    pub fn alias(&self) -> &'static str {
        match self {
            StageKind::Base => "base",
            StageKind::Galaxy => "galaxy",
            StageKind::Builder => "builder",
            StageKind::Final => "final",
        }
    }

    pub(crate) fn comment(&self) -> &'static str {
        match self {
            StageKind::Base => "# Base build stage",
            StageKind::Galaxy => "# Galaxy build stage",
            StageKind::Builder => "# Builder build stage",
            StageKind::Final => "# Final build stage",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.alias())
    }
}

/// A build stage and its lines, header included
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    kind: StageKind,
    steps: Vec<String>,
}

impl Stage {
    pub(crate) fn new(kind: StageKind) -> Self {
        Self {
            kind,
            steps: Vec::new(),
        }
    }

    pub fn kind(&self) -> StageKind {
        self.kind
    }

    pub fn steps(&self) -> &[String] {
        &self.steps
    }

    pub(crate) fn push(&mut self, step: impl Into<String>) {
        self.steps.push(step.into());
    }

    pub(crate) fn extend<I, S>(&mut self, steps: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.steps.extend(steps.into_iter().map(Into::into));
    }
}

/// Ordered global build arguments followed by the four stages.
///
/// Built once by [`compile`](super::compile) and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildPlan {
    global_args: Vec<String>,
    stages: [Stage; 4],
}

impl BuildPlan {
    pub(crate) fn new(global_args: Vec<String>, stages: [Stage; 4]) -> Self {
        Self {
            global_args,
            stages,
        }
    }

    /// `ARG NAME="value"` declarations preceding the first stage
    pub fn global_args(&self) -> &[String] {
        &self.global_args
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn stage(&self, kind: StageKind) -> &Stage {
        match kind {
            StageKind::Base => &self.stages[0],
            StageKind::Galaxy => &self.stages[1],
            StageKind::Builder => &self.stages[2],
            StageKind::Final => &self.stages[3],
        }
    }

    /// Every line of the build file; stages are separated by a blank line
    pub fn lines(&self) -> Vec<&str> {
        let mut lines: Vec<&str> = self.global_args.iter().map(String::as_str).collect();
        lines.push("");

        for (index, stage) in self.stages.iter().enumerate() {
            if index > 0 {
                lines.push("");
            }
            lines.extend(stage.steps.iter().map(String::as_str));
        }

        lines
    }

    /// The build file text, newline terminated
    pub fn render(&self) -> String {
        let mut text = self.lines().join("\n");
        text.push('\n');
        text
    }
}

impl fmt::Display for BuildPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}
