use super::*;

#[test]
fn test_build_is_acyclic() {
    let graph = TaskGraph::build().unwrap();
    assert_eq!(graph.len(), 9);
    assert!(graph.validate().is_ok());
}

#[test]
fn test_cycle_is_rejected() {
    let mut graph = TaskGraph::empty();
    let a = StepId::new("a");
    let b = StepId::new("b");
    graph
        .add_step_unchecked(StepNode {
            id: a.clone(),
            stage: StageKind::QueryAnalysis,
            deps: vec![b.clone()],
            status: StepStatus::Blocked,
            failure_tolerant: false,
            fanout_index: 0,
        })
        .unwrap();
    graph
        .add_step_unchecked(StepNode {
            id: b.clone(),
            stage: StageKind::SourceDiscovery,
            deps: vec![a.clone()],
            status: StepStatus::Blocked,
            failure_tolerant: false,
            fanout_index: 0,
        })
        .unwrap();

    assert!(matches!(graph.validate(), Err(GraphError::Cycle(_))));
}

#[test]
fn test_duplicate_step_rejected() {
    let mut graph = TaskGraph::empty();
    graph
        .add_step(StepNode::new("a", StageKind::QueryAnalysis, &[]))
        .unwrap();
    let err = graph
        .add_step(StepNode::new("a", StageKind::Planning, &[]))
        .unwrap_err();
    assert!(matches!(err, GraphError::DuplicateStep(_)));
}

#[test]
fn test_unknown_dependency_rejected() {
    let mut graph = TaskGraph::empty();
    let ghost = StepId::new("ghost");
    let err = graph
        .add_step(StepNode::new("a", StageKind::QueryAnalysis, &[&ghost]))
        .unwrap_err();
    assert!(matches!(err, GraphError::UnknownDependency { .. }));
}

#[test]
fn test_next_ready_initial() {
    let mut graph = TaskGraph::build().unwrap();
    // 初始只有无依赖的查询分析可派发
    assert_eq!(graph.next_ready(), vec![StepId::new("query_analysis")]);
}

#[test]
fn test_dependency_unlock_order() {
    let mut graph = TaskGraph::build().unwrap();
    let query = StepId::new("query_analysis");
    let discovery = StepId::new("source_discovery");

    graph.set_status(&query, StepStatus::Succeeded).unwrap();
    assert_eq!(graph.next_ready(), vec![discovery.clone()]);

    graph.set_status(&discovery, StepStatus::Succeeded).unwrap();
    assert_eq!(graph.next_ready(), vec![StepId::new("planning")]);
}

#[test]
fn test_fanout_expansion() {
    let mut graph = TaskGraph::build().unwrap();
    let added = graph.expand_research_fanout(3).unwrap();
    assert_eq!(
        added,
        vec![
            StepId::new("parallel_research_1"),
            StepId::new("parallel_research_2")
        ]
    );
    // 聚合步骤等待全部兄弟
    let agg_deps = graph.deps(&StepId::new("aggregation"));
    assert_eq!(agg_deps.len(), 3);
    assert!(graph.validate().is_ok());

    // 兄弟步骤同时就绪，按发现顺序排序
    for id in ["query_analysis", "source_discovery", "planning"] {
        graph.set_status(&StepId::new(id), StepStatus::Succeeded).unwrap();
    }
    assert_eq!(
        graph.next_ready(),
        vec![
            StepId::new("parallel_research_0"),
            StepId::new("parallel_research_1"),
            StepId::new("parallel_research_2")
        ]
    );
}

#[test]
fn test_failure_propagates_as_skip() {
    let mut graph = TaskGraph::build().unwrap();
    let query = StepId::new("query_analysis");
    let discovery = StepId::new("source_discovery");

    graph.set_status(&query, StepStatus::Succeeded).unwrap();
    graph.set_status(&discovery, StepStatus::Failed).unwrap();

    let ready = graph.next_ready();
    // 下游非容错步骤全部被跳过
    for id in [
        "planning",
        "parallel_research_0",
        "aggregation",
        "reasoning",
    ] {
        assert_eq!(
            graph.status(&StepId::new(id)),
            Some(StepStatus::Skipped),
            "step {} should be skipped",
            id
        );
    }
    // 容错的报告步骤依赖已全部终态，照常就绪
    assert_eq!(ready, vec![StepId::new("reporting")]);
}

#[test]
fn test_reporting_tolerates_failed_upstream() {
    let mut graph = TaskGraph::build().unwrap();
    for id in ["query_analysis", "source_discovery", "planning", "parallel_research_0", "aggregation"] {
        graph.set_status(&StepId::new(id), StepStatus::Succeeded).unwrap();
    }
    graph.set_status(&StepId::new("reasoning"), StepStatus::Failed).unwrap();

    assert_eq!(graph.next_ready(), vec![StepId::new("reporting")]);
    assert!(!graph.is_resolved());
}

#[test]
fn test_resolution_and_complete_judgement() {
    let mut graph = TaskGraph::build().unwrap();
    for id in graph.step_ids() {
        graph.set_status(&id, StepStatus::Succeeded).unwrap();
    }
    assert!(graph.is_resolved());
    assert!(graph.all_non_skipped_succeeded());
    assert!(!graph.has_failures());
    assert!(graph.incomplete_stages().is_empty());
}

#[test]
fn test_incomplete_stages_after_failure() {
    let mut graph = TaskGraph::build().unwrap();
    let query = StepId::new("query_analysis");
    graph.set_status(&query, StepStatus::Succeeded).unwrap();
    graph
        .set_status(&StepId::new("source_discovery"), StepStatus::Failed)
        .unwrap();
    graph.next_ready();

    let incomplete = graph.incomplete_stages();
    assert!(incomplete.contains(&"SOURCE_DISCOVERY".to_string()));
    assert!(incomplete.contains(&"REASONING".to_string()));
    assert!(!incomplete.contains(&"QUERY_ANALYSIS".to_string()));
}

#[test]
fn test_expansion_into_cycle_is_rejected() {
    // 人为让种子步骤依赖聚合步骤，扩展时必须报环
    let mut graph = TaskGraph::empty();
    graph
        .add_step(StepNode::new("planning", StageKind::Planning, &[]))
        .unwrap();
    let planning = StepId::new("planning");
    graph
        .add_step_unchecked(StepNode {
            id: StepId::new("parallel_research_0"),
            stage: StageKind::ParallelResearch,
            deps: vec![planning.clone(), StepId::new("aggregation")],
            status: StepStatus::Blocked,
            failure_tolerant: false,
            fanout_index: 0,
        })
        .unwrap();
    graph
        .add_step_unchecked(StepNode {
            id: StepId::new("aggregation"),
            stage: StageKind::Aggregation,
            deps: vec![StepId::new("parallel_research_0")],
            status: StepStatus::Blocked,
            failure_tolerant: false,
            fanout_index: 0,
        })
        .unwrap();

    assert!(matches!(
        graph.expand_research_fanout(2),
        Err(GraphError::Cycle(_))
    ));
}
