use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use dmrpp::{
    chunk::format_position_in_array,
    dap::Dmr,
    dmz::DmzDocument,
};

/// A document with `num_variables` chunked arrays of shape `[size, size]` and chunk shape `[16, 16]`, missing every other chunk.
fn document(num_variables: usize, size: u64) -> String {
    let mut xml = String::from(r#"<Dataset name="bench.h5" dmrpp:href="bench.h5">"#);
    for variable in 0..num_variables {
        xml.push_str(&format!(
            r#"<Float32 name="v{variable}"><Dim size="{size}"/><Dim size="{size}"/><dmrpp:chunks compressionType="deflate" deflateLevel="4" byteOrder="LE" fillValue="0"><dmrpp:chunkDimensionSizes>16 16</dmrpp:chunkDimensionSizes>"#
        ));
        let mut offset = 0;
        for i in (0..size).step_by(16) {
            for j in (0..size).step_by(32) {
                let position = format_position_in_array(&[i, j]);
                xml.push_str(&format!(
                    r#"<dmrpp:chunk offset="{offset}" nBytes="512" chunkPositionInArray="{position}"/>"#
                ));
                offset += 512;
            }
        }
        xml.push_str("</dmrpp:chunks></Float32>");
    }
    xml.push_str("</Dataset>");
    xml
}

fn dmz(c: &mut Criterion) {
    let mut group = c.benchmark_group("dmz");
    for num_variables in [10, 100] {
        let xml = document(num_variables, 256);
        group.throughput(Throughput::Bytes(xml.len() as u64));
        group.bench_function(BenchmarkId::new("build_thin_dmr", num_variables), |b| {
            b.iter(|| {
                let document = DmzDocument::new_from_str(&xml).unwrap();
                let mut dmr = Dmr::default();
                document.build_thin_dmr(&mut dmr).unwrap();
                dmr
            });
        });

        let document = DmzDocument::new_from_str(&xml).unwrap();
        let mut thin = Dmr::default();
        document.build_thin_dmr(&mut thin).unwrap();
        group.bench_function(BenchmarkId::new("load_chunks", num_variables), |b| {
            b.iter(|| {
                let mut dmr = thin.clone();
                for variable in dmr.root_mut().variables_mut() {
                    document.load_chunks(variable).unwrap();
                }
                dmr
            });
        });
    }
    group.finish();
}

criterion_group!(benches, dmz);
criterion_main!(benches);
