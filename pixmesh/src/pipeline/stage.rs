use std::fmt;

use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
	StyleConversion,
	PoseConversion,
	MultiView,
	Model3d,
}

impl Stage {
	/// Run order.
	pub const ALL: [Stage; 4] = [
		Stage::StyleConversion,
		Stage::PoseConversion,
		Stage::MultiView,
		Stage::Model3d,
	];

	pub fn id(self) -> &'static str {
		match self {
			Stage::StyleConversion => "style-conversion",
			Stage::PoseConversion => "pose-conversion",
			Stage::MultiView => "multi-view",
			Stage::Model3d => "3d-model",
		}
	}

	pub fn title(self) -> &'static str {
		match self {
			Stage::StyleConversion => "Style Conversion",
			Stage::PoseConversion => "T-Pose Generation",
			Stage::MultiView => "Multi-View Generation",
			Stage::Model3d => "3D Model Creation",
		}
	}

	pub fn description(self) -> &'static str {
		match self {
			Stage::StyleConversion => "Transform pixel art to Genshin Impact style",
			Stage::PoseConversion => "Convert character to T-pose",
			Stage::MultiView => "Create front, side, and back views",
			Stage::Model3d => "Generate textured 3D model",
		}
	}

	pub fn index(self) -> usize {
		self as usize
	}

	pub fn next(self) -> Option<Stage> {
		Stage::ALL.get(self.index() + 1).copied()
	}
}

impl fmt::Display for Stage {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.id())
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StepStatus {
	#[default]
	Pending,
	Processing,
	Completed,
	Error,
}

impl fmt::Display for StepStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			StepStatus::Pending => "pending",
			StepStatus::Processing => "processing",
			StepStatus::Completed => "completed",
			StepStatus::Error => "error",
		})
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepEvent {
	/// The stage's first remote call went out.
	Dispatch,
	/// Progress in percent, clamped to 100.
	Progress(u8),
	Succeed,
	Fail,
	Reset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EventKind {
	Dispatch,
	Progress,
	Succeed,
	Fail,
	Reset,
}

impl StepEvent {
	fn kind(self) -> EventKind {
		match self {
			StepEvent::Dispatch => EventKind::Dispatch,
			StepEvent::Progress(_) => EventKind::Progress,
			StepEvent::Succeed => EventKind::Succeed,
			StepEvent::Fail => EventKind::Fail,
			StepEvent::Reset => EventKind::Reset,
		}
	}
}

/// `(from, event, to)`. `Reset` is accepted from every status and not listed.
const TRANSITIONS: [(StepStatus, EventKind, StepStatus); 4] = [
	(StepStatus::Pending, EventKind::Dispatch, StepStatus::Processing),
	(StepStatus::Processing, EventKind::Progress, StepStatus::Processing),
	(StepStatus::Processing, EventKind::Succeed, StepStatus::Completed),
	(StepStatus::Processing, EventKind::Fail, StepStatus::Error),
];

pub fn transition(from: StepStatus, event: StepEvent) -> Option<StepStatus> {
	let kind = event.kind();
	if kind == EventKind::Reset {
		return Some(StepStatus::Pending);
	}
	TRANSITIONS
		.iter()
		.find(|(f, e, _)| *f == from && *e == kind)
		.map(|&(_, _, to)| to)
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Cannot apply {event:?} to {stage} while it is {from}")]
pub struct InvalidTransition {
	pub stage: Stage,
	pub from: StepStatus,
	pub event: StepEvent,
}

/// Display state of one stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingStep {
	pub stage: Stage,
	pub status: StepStatus,
	/// Percent, `None` outside of processing.
	pub progress: Option<u8>,
}

impl ProcessingStep {
	pub fn new(stage: Stage) -> Self {
		Self {
			stage,
			status: StepStatus::Pending,
			progress: None,
		}
	}

	pub fn id(&self) -> &'static str {
		self.stage.id()
	}

	pub fn title(&self) -> &'static str {
		self.stage.title()
	}

	pub fn description(&self) -> &'static str {
		self.stage.description()
	}

	/// The step after `event`; `self` is left as is.
	pub fn apply(&self, event: StepEvent) -> Result<ProcessingStep, InvalidTransition> {
		let status = transition(self.status, event).ok_or(InvalidTransition {
			stage: self.stage,
			from: self.status,
			event,
		})?;
		let progress = match event {
			StepEvent::Dispatch => Some(0),
			StepEvent::Progress(p) => Some(p.min(100)),
			StepEvent::Succeed => Some(100),
			StepEvent::Fail => self.progress,
			StepEvent::Reset => None,
		};
		debug!("{}: {} -> {}", self.stage, self.status, status);
		Ok(ProcessingStep {
			stage: self.stage,
			status,
			progress,
		})
	}
}

/// Fresh pending steps in run order.
pub fn initial_steps() -> Vec<ProcessingStep> {
	Stage::ALL.iter().copied().map(ProcessingStep::new).collect()
}
