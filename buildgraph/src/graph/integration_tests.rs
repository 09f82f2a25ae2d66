//! End-to-end tests for graph construction, gating, and storage flow.

#[cfg(test)]
mod tests {
    use crate::core::BuildProducts;
    use crate::errors::GraphError;
    use crate::graph::{GraphBuilder, NodeSpec, StepDeclaration};
    use crate::node::{
        AggregateSpec, BuildAction, BuildContext, LegacyStep, LegacyStepMetadata, RunMode,
        TriggerState,
    };
    use crate::storage::{ArtifactStore, MemoryArtifactStore};
    use crate::testing::{ExecutionLog, FailingAction, ProductsAction, RecordingAction};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn init_tracing() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    }

    fn release_pipeline() -> crate::graph::BuildGraph {
        let mut builder = GraphBuilder::new("release");
        builder
            .add(NodeSpec::new(
                "Compile",
                Arc::new(ProductsAction::new(["bin/game", "bin/editor"])),
            ))
            .unwrap();
        builder
            .add(
                NodeSpec::new("Test", Arc::new(ProductsAction::new(["reports/tests.xml"])))
                    .with_input_dependency("Compile"),
            )
            .unwrap();
        builder.add_trigger("ReleaseGate", TriggerState::new()).unwrap();
        builder
            .add(
                NodeSpec::new("Package", Arc::new(ProductsAction::new(["dist/game.zip"])))
                    .with_input_dependency("Test")
                    .with_controlling_trigger("ReleaseGate"),
            )
            .unwrap();
        builder.build().unwrap()
    }

    #[tokio::test]
    async fn test_release_gate_scenario() {
        init_tracing();
        let store = MemoryArtifactStore::new();
        let mut graph = release_pipeline();
        graph.set_store_prefix("cl-1000");

        // Everything up to the gate runs; Package is held.
        let result = graph.execute(Some(&store), RunMode::Real).await.unwrap();
        assert!(result.success);
        assert!(graph.node("Compile").unwrap().is_complete());
        assert!(graph.node("Test").unwrap().is_complete());
        assert!(graph.node("ReleaseGate").unwrap().is_complete());
        assert!(!graph.node("Package").unwrap().is_complete());
        assert_eq!(result.gated, vec!["Package".to_string()]);

        // Running the gated node directly is rejected, not silently skipped.
        let err = graph
            .run_node("Package", Some(&store), RunMode::Real)
            .await
            .unwrap_err();
        assert!(matches!(err, GraphError::TriggerGate(_)));

        // After activation the node becomes eligible and completes.
        graph.activate_trigger("ReleaseGate").unwrap();
        assert!(graph.ready_nodes().contains(&"Package"));
        graph
            .run_node("Package", Some(&store), RunMode::Real)
            .await
            .unwrap();

        let package = graph.node("Package").unwrap();
        assert!(package.is_complete());
        assert!(!package.build_products().is_empty());

        // The products are retrievable from the store under the node's key.
        let retrieved = store.retrieve("cl-1000-Package", "", "").unwrap();
        assert_eq!(retrieved.products.as_slice(), &["dist/game.zip"]);
    }

    #[tokio::test]
    async fn test_trigger_cannot_activate_before_completion() {
        let mut graph = release_pipeline();
        let err = graph.activate_trigger("ReleaseGate").unwrap_err();
        assert!(matches!(err, GraphError::TriggerNotReady(_)));

        let err = graph.activate_trigger("Compile").unwrap_err();
        assert!(matches!(err, GraphError::NotATrigger(_)));
    }

    #[tokio::test]
    async fn test_execution_respects_topology() {
        let log = ExecutionLog::new();
        let mut builder = GraphBuilder::new("diamond");
        for (name, deps) in [
            ("Root", vec![]),
            ("Left", vec!["Root"]),
            ("Right", vec!["Root"]),
            ("Join", vec!["Left", "Right"]),
        ] {
            let mut spec = NodeSpec::new(name, Arc::new(RecordingAction::new(log.clone())));
            for dep in deps {
                spec = spec.with_input_dependency(dep);
            }
            builder.add(spec).unwrap();
        }
        let mut graph = builder.build().unwrap();

        let result = graph.execute(None, RunMode::Real).await.unwrap();
        assert!(result.success);
        assert_eq!(log.len(), 4);
        assert!(log.position("Root").unwrap() < log.position("Left").unwrap());
        assert!(log.position("Root").unwrap() < log.position("Right").unwrap());
        assert!(log.position("Left").unwrap() < log.position("Join").unwrap());
        assert!(log.position("Right").unwrap() < log.position("Join").unwrap());
    }

    #[tokio::test]
    async fn test_failure_stops_downstream_and_names_node() {
        let mut builder = GraphBuilder::new("failing");
        builder
            .add(NodeSpec::new(
                "Broken",
                Arc::new(FailingAction::new("compiler exited with status 1")),
            ))
            .unwrap();
        builder
            .add(
                NodeSpec::new("Downstream", Arc::new(ProductsAction::new(["x"])))
                    .with_input_dependency("Broken"),
            )
            .unwrap();
        let mut graph = builder.build().unwrap();

        let result = graph.execute(None, RunMode::Real).await.unwrap();
        assert!(!result.success);
        let message = result.error.unwrap();
        assert!(message.contains("Broken"));
        assert!(message.contains("compiler exited with status 1"));
        assert_eq!(result.skipped, vec!["Downstream".to_string()]);
        assert!(!graph.node("Broken").unwrap().is_complete());
    }

    #[tokio::test]
    async fn test_failure_leaves_sibling_archives_intact() {
        let store = MemoryArtifactStore::new();
        let mut builder = GraphBuilder::new("siblings");
        builder
            .add(NodeSpec::new(
                "Good",
                Arc::new(ProductsAction::new(["good.bin"])),
            ))
            .unwrap();
        builder
            .add(NodeSpec::new("Bad", Arc::new(FailingAction::new("boom"))))
            .unwrap();
        let mut graph = builder.build().unwrap();

        let result = graph.execute(Some(&store), RunMode::Real).await.unwrap();
        assert!(!result.success);

        let retrieved = store.retrieve("Good", "", "").unwrap();
        assert_eq!(retrieved.products.as_slice(), &["good.bin"]);
    }

    #[tokio::test]
    async fn test_fake_run_skips_real_actions() {
        let log = ExecutionLog::new();
        let mut builder = GraphBuilder::new("dry");
        builder
            .add(NodeSpec::new(
                "Compile",
                Arc::new(RecordingAction::new(log.clone())),
            ))
            .unwrap();
        builder
            .add(
                NodeSpec::new("Test", Arc::new(RecordingAction::new(log.clone())))
                    .with_input_dependency("Compile"),
            )
            .unwrap();
        let mut graph = builder.build().unwrap();

        let result = graph.execute(None, RunMode::Fake).await.unwrap();
        assert!(result.success);
        assert!(log.is_empty());

        // Simulated success still completes nodes and leaves placeholder
        // products behind.
        assert!(graph.node("Compile").unwrap().is_complete());
        assert_eq!(
            graph.node("Compile").unwrap().build_products().as_slice(),
            &["Compile_Success.log"]
        );
    }

    #[tokio::test]
    async fn test_resumed_pipeline_retrieves_instead_of_rebuilding() {
        let store = MemoryArtifactStore::new();

        // First run archives everything.
        let mut first = release_pipeline();
        first.set_store_prefix("cl-2000");
        first.execute(Some(&store), RunMode::Real).await.unwrap();

        // A fresh graph on another agent probes the store, marks archived
        // nodes complete, and rebuilds nothing.
        store.forget_local();
        let log = ExecutionLog::new();
        let mut builder = GraphBuilder::new("resumed");
        builder
            .add(NodeSpec::new(
                "Compile",
                Arc::new(RecordingAction::new(log.clone())),
            ))
            .unwrap();
        builder
            .add(
                NodeSpec::new("Test", Arc::new(RecordingAction::new(log.clone())))
                    .with_input_dependency("Compile"),
            )
            .unwrap();
        let mut resumed = builder.build().unwrap();
        resumed.set_store_prefix("cl-2000");

        resumed.find_completion_state(&store, false).unwrap();
        assert!(resumed.node("Compile").unwrap().is_complete());
        assert!(resumed.node("Test").unwrap().is_complete());

        let result = resumed.execute(Some(&store), RunMode::Real).await.unwrap();
        assert!(result.success);
        assert!(log.is_empty());

        // Hydrated from the store, not rebuilt.
        assert_eq!(
            result.products.get("Compile").unwrap().as_slice(),
            &["bin/game", "bin/editor"]
        );
    }

    #[tokio::test]
    async fn test_scoped_retrieval_falls_back_to_shared_entry() {
        let store = MemoryArtifactStore::new();

        // Archive under the empty scope only, then build a graph whose node
        // declares a game scope.
        store
            .archive(
                "cl-3-Cook",
                &["cooked/pak0"].into_iter().collect(),
                false,
                "",
                "",
            )
            .unwrap();
        store.forget_local();

        let declaration = StepDeclaration::new("Cook").with_game_scope("Shooter");
        let mut builder = GraphBuilder::new("scoped");
        builder.add_declaration(&declaration).unwrap();
        let mut graph = builder.build().unwrap();
        graph.set_store_prefix("cl-3");

        graph.find_completion_state(&store, false).unwrap();
        assert!(graph.node("Cook").unwrap().is_complete());

        let result = graph.execute(Some(&store), RunMode::Real).await.unwrap();
        assert!(result.success);
        assert_eq!(
            result.products.get("Cook").unwrap().as_slice(),
            &["cooked/pak0"]
        );
    }

    #[tokio::test]
    async fn test_dependency_products_flow_downstream() {
        /// Captures the flattened dependency products it was handed.
        #[derive(Debug)]
        struct CapturingAction {
            seen: Arc<parking_lot::Mutex<Vec<String>>>,
        }

        #[async_trait]
        impl BuildAction for CapturingAction {
            async fn build(&self, ctx: &BuildContext) -> anyhow::Result<BuildProducts> {
                *self.seen.lock() = ctx.all_dependency_products().as_slice().to_vec();
                Ok(["link/final.bin"].into_iter().collect())
            }
        }

        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let mut builder = GraphBuilder::new("flow");
        builder
            .add(NodeSpec::new(
                "A",
                Arc::new(ProductsAction::new(["a.obj"])),
            ))
            .unwrap();
        builder
            .add(NodeSpec::new(
                "B",
                Arc::new(ProductsAction::new(["b.obj"])),
            ))
            .unwrap();
        builder
            .add(
                NodeSpec::new(
                    "Link",
                    Arc::new(CapturingAction { seen: seen.clone() }),
                )
                .with_input_dependency("A")
                .with_input_dependency("B"),
            )
            .unwrap();
        let mut graph = builder.build().unwrap();

        graph.execute(None, RunMode::Real).await.unwrap();
        assert_eq!(*seen.lock(), vec!["a.obj".to_string(), "b.obj".to_string()]);
    }

    #[tokio::test]
    async fn test_order_dependency_sequences_without_product_flow() {
        let mut builder = GraphBuilder::new("ordered");
        builder
            .add(NodeSpec::new(
                "Noisy",
                Arc::new(ProductsAction::new(["noise.log"])),
            ))
            .unwrap();
        builder
            .add(
                NodeSpec::new("Quiet", Arc::new(ProductsAction::new(["quiet.bin"])))
                    .with_order_dependency("Noisy"),
            )
            .unwrap();
        let mut graph = builder.build().unwrap();

        let err = graph.run_node("Quiet", None, RunMode::Real).await.unwrap_err();
        assert!(matches!(err, GraphError::DependencyIncomplete(_)));

        graph.run_node("Noisy", None, RunMode::Real).await.unwrap();
        graph.run_node("Quiet", None, RunMode::Real).await.unwrap();

        // Ordering held, but the order dependency's product was not consumed.
        let quiet = graph.node("Quiet").unwrap();
        assert!(quiet.depends_on("Noisy"));
        assert_eq!(quiet.build_products().as_slice(), &["quiet.bin"]);
    }

    #[tokio::test]
    async fn test_aggregate_completes_without_products() {
        let store = MemoryArtifactStore::new();
        let mut builder = GraphBuilder::new("agg");
        builder
            .add(NodeSpec::new(
                "T1",
                Arc::new(ProductsAction::new(["t1.xml"])),
            ))
            .unwrap();
        builder
            .add(NodeSpec::new(
                "T2",
                Arc::new(ProductsAction::new(["t2.xml"])),
            ))
            .unwrap();
        builder
            .add_aggregate(&AggregateSpec::of_members("AllTests", ["T1", "T2"]).promotable())
            .unwrap();
        let mut graph = builder.build().unwrap();

        let result = graph.execute(Some(&store), RunMode::Real).await.unwrap();
        assert!(result.success);

        let aggregate = graph.node("AllTests").unwrap();
        assert!(aggregate.is_complete());
        assert!(aggregate.build_products().is_empty());
        assert!(aggregate.aggregate_info().unwrap().is_promotable_aggregate);

        // Aggregates are rollups only; nothing is archived for them.
        assert!(store.retrieve("AllTests", "", "").is_err());
    }

    #[tokio::test]
    async fn test_legacy_step_round_trip() {
        /// A legacy description that stamps its inputs into its output.
        #[derive(Debug)]
        struct OldPackageStep;

        #[async_trait]
        impl LegacyStep for OldPackageStep {
            fn name(&self) -> &str {
                "OldPackage"
            }

            fn metadata(&self) -> LegacyStepMetadata {
                LegacyStepMetadata {
                    agent: crate::core::AgentConstraints::new()
                        .with_requirements("Packager")
                        .with_timeout_minutes(120),
                    input_dependencies: vec!["Compile".to_string()],
                    game_scope: "Shooter".to_string(),
                    ..LegacyStepMetadata::default()
                }
            }

            async fn build(
                &self,
                dependency_products: &BuildProducts,
            ) -> anyhow::Result<BuildProducts> {
                let mut products = BuildProducts::new();
                products.add(format!(
                    "packaged-from-{}-inputs.zip",
                    dependency_products.len()
                ));
                Ok(products)
            }

            async fn fake_build(
                &self,
                _dependency_products: &BuildProducts,
            ) -> anyhow::Result<BuildProducts> {
                Ok(BuildProducts::new())
            }
        }

        let mut builder = GraphBuilder::new("legacy");
        builder
            .add(NodeSpec::new(
                "Compile",
                Arc::new(ProductsAction::new(["bin/game", "bin/editor"])),
            ))
            .unwrap();
        builder.add_legacy_step(Arc::new(OldPackageStep)).unwrap();
        let mut graph = builder.build().unwrap();

        // The metadata snapshot landed on the node.
        let node = graph.node("OldPackage").unwrap();
        assert_eq!(node.agent().requirements, "Packager");
        assert_eq!(node.agent().timeout_minutes, 120);
        assert_eq!(node.game_scope(), "Shooter");
        assert_eq!(node.input_dependencies(), &["Compile"]);

        let result = graph.execute(None, RunMode::Real).await.unwrap();
        assert!(result.success);
        assert_eq!(
            graph.node("OldPackage").unwrap().build_products().as_slice(),
            &["packaged-from-2-inputs.zip"]
        );
    }

    #[tokio::test]
    async fn test_declarative_pipeline_from_json() {
        let raw = r#"[
            {"name": "Version", "is_sticky": true},
            {"name": "Compile", "dependencies": "Version"},
            {"name": "CookShooter", "dependencies": "Compile", "game_scope": "Shooter"},
            {"name": "Gate", "dependencies": "CookShooter"},
            {"name": "Deploy", "dependencies": "CookShooter", "triggers": "Gate"}
        ]"#;
        let declarations: Vec<StepDeclaration> = serde_json::from_str(raw).unwrap();

        let mut builder = GraphBuilder::new("declared");
        for declaration in &declarations {
            if declaration.name == "Gate" {
                let mut spec = NodeSpec::trigger("Gate", TriggerState::new());
                for dep in declaration.declared_dependency_names() {
                    spec = spec.with_input_dependency(dep);
                }
                builder.add(spec).unwrap();
            } else {
                builder.add_declaration(declaration).unwrap();
            }
        }
        let mut graph = builder.build().unwrap();

        let result = graph.execute(None, RunMode::Real).await.unwrap();
        assert!(result.success);
        assert_eq!(result.gated, vec!["Deploy".to_string()]);

        graph.activate_trigger("Gate").unwrap();
        let result = graph.execute(None, RunMode::Real).await.unwrap();
        assert!(result.success);
        assert!(result.gated.is_empty());
        assert!(graph.node("Deploy").unwrap().is_complete());
        assert_eq!(graph.node("Deploy").unwrap().controlling_trigger_path(), "Gate");
    }
}
