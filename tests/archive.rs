use std::fs;
use std::io::Read;
use std::path::Path;

use amazon_reviews_downloader::archive::compress_folder;
use amazon_reviews_downloader::domain::CompressionFormat;

fn write_sample(folder: &Path) {
    fs::create_dir_all(folder.join("full")).unwrap();
    fs::write(folder.join("dataset_dict.json"), b"{\"splits\":[\"full\"]}").unwrap();
    fs::write(
        folder.join("full").join("data-00000-of-00001.jsonl"),
        b"{\"rating\": 4.0, \"text\": \"works\"}\n",
    )
    .unwrap();
}

fn unpack(archive: &Path, format: CompressionFormat, dest: &Path) {
    let file = fs::File::open(archive).unwrap();
    let reader: Box<dyn Read> = match format {
        CompressionFormat::Gz => Box::new(flate2::read::GzDecoder::new(file)),
        CompressionFormat::Bz2 => Box::new(bzip2::read::BzDecoder::new(file)),
        CompressionFormat::Xz => Box::new(xz2::read::XzDecoder::new(file)),
    };
    tar::Archive::new(reader).unpack(dest).unwrap();
}

#[test]
fn round_trip_every_format() {
    for format in CompressionFormat::ALL {
        let temp = tempfile::tempdir().unwrap();
        let folder = temp.path().join("raw_review_Software");
        write_sample(&folder);

        let archive = compress_folder(&folder, format, 1).unwrap();
        assert_eq!(
            archive,
            temp.path()
                .join(format!("raw_review_Software{}", format.extension()))
        );
        assert!(!folder.exists());

        let restored = temp.path().join("restored");
        unpack(&archive, format, &restored);
        let root = restored.join("raw_review_Software");
        assert_eq!(
            fs::read(root.join("dataset_dict.json")).unwrap(),
            b"{\"splits\":[\"full\"]}"
        );
        assert_eq!(
            fs::read(root.join("full").join("data-00000-of-00001.jsonl")).unwrap(),
            b"{\"rating\": 4.0, \"text\": \"works\"}\n"
        );
    }
}

#[test]
fn gzip_levels_all_round_trip() {
    for level in 1..=9 {
        let temp = tempfile::tempdir().unwrap();
        let folder = temp.path().join("raw_meta_Books");
        write_sample(&folder);

        let archive = compress_folder(&folder, CompressionFormat::Gz, level).unwrap();
        let restored = temp.path().join("restored");
        unpack(&archive, CompressionFormat::Gz, &restored);
        assert!(
            restored
                .join("raw_meta_Books")
                .join("full")
                .join("data-00000-of-00001.jsonl")
                .is_file()
        );
    }
}

#[test]
fn no_partial_files_left_behind() {
    let temp = tempfile::tempdir().unwrap();
    let folder = temp.path().join("raw_meta_Books");
    write_sample(&folder);

    compress_folder(&folder, CompressionFormat::Xz, 6).unwrap();
    let names: Vec<String> = fs::read_dir(temp.path())
        .unwrap()
        .filter_map(Result::ok)
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["raw_meta_Books.tar.xz".to_string()]);
}
