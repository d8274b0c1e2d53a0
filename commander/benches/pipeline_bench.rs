//! Benchmarks for compiling and invoking pipelines.

use commander::prelude::*;
use commander::testing::{ExecutionLog, PublishResult, RecordingStep};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

#[derive(Debug, Default)]
struct Order {
    total: u32,
}

fn commander(steps: usize) -> Commander {
    let log = ExecutionLog::new();
    let mut chain = CommandChain::for_entity::<Order>();
    for i in 0..steps {
        chain.prepend(CommandNode::call(RecordingStep::call(format!("step-{i}"), &log)));
    }
    chain.add_to_end(CommandNode::call(PublishResult::<Order>::call()));

    let mut graph = CommandGraph::new();
    graph.add_chain_for_new(chain);

    let builders = EntityBuilderRegistry::new();
    builders.register_default::<Order>();

    Commander::builder(graph)
        .builders(builders)
        .build()
        .unwrap()
}

fn pipeline_benchmark(c: &mut Criterion) {
    for steps in [1, 10] {
        let commander = commander(steps);

        c.bench_function(&format!("compile_{steps}_steps"), |b| {
            b.iter(|| {
                let command = commander
                    .compiler()
                    .compile_new::<Order, _>(
                        commander.graph(),
                        |_| {},
                        CommandCall::for_command::<Order, _>(EmptyDomainCommand::new()),
                    )
                    .unwrap();
                black_box(command.len())
            });
        });

        c.bench_function(&format!("invoke_{steps}_steps"), |b| {
            b.iter(|| {
                let result = commander
                    .invoker()
                    .for_new(FnCommand::new(|order: &mut Order| {
                        order.total += 1;
                        Ok(())
                    }))
                    .unwrap();
                black_box(result.entity.total)
            });
        });
    }
}

criterion_group!(benches, pipeline_benchmark);
criterion_main!(benches);
