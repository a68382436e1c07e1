use criterion::{black_box, criterion_group, criterion_main, Criterion};
use strata_graph::{conv2d, rectify, Conv2dParams, DType, Graph, InitFn, NodeSpec, Tensor};

fn bench_conv2d(c: &mut Criterion) {
    let mut group = c.benchmark_group("conv2d_eval");
    for (batch, channels, size) in [(1, 3, 32), (8, 3, 32), (1, 16, 64)] {
        let g = Graph::with_seed(0);
        let x = g.placeholder(DType::F32, [batch, channels, size, size], "x");
        let w = g
            .new_tensor(DType::F32, 4, NodeSpec::new([16, channels, 5, 5]).with_init(InitFn::GlorotN(1.0)))
            .unwrap();
        let params = Conv2dParams {
            kernel: (5, 5),
            pad: (1, 1),
            stride: (1, 1),
            dilation: (1, 1),
        };
        let y = rectify(&conv2d(&x, &w, params).unwrap()).unwrap();
        x.bind(Tensor::full(DType::F32, [batch, channels, size, size], 0.5)).unwrap();

        group.bench_function(format!("b={}_c={}_hw={}", batch, channels, size), |b| {
            b.iter(|| black_box(y.eval().unwrap()))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_conv2d);
criterion_main!(benches);
