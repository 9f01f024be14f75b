pub mod claim;
pub mod research;
pub mod verdict;

pub use claim::{ClaimType, Entities, StructuredClaim, UrgencyLevel};
pub use research::{
    AggregatedData, PlanningOutput, ResearchFinding, ResearchOutput, ResearchQuestion, SearchHit,
    SourceFinderOutput, TimelineEvent,
};
pub use verdict::{
    AnalysisOutput, ChatIndexOutput, CredibilityBar, EvidenceGroups, SourceRef, TruthMeter,
    VerdictLabel, VerdictReport, VisualizationSpec,
};
