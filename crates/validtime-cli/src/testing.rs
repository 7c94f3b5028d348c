use interprocess::local_socket::{tokio::prelude::*, GenericFilePath, ListenerOptions};
use std::path::{Path, PathBuf};
use validtime_protocol::{read_message, write_message, Request, Response};

pub fn test_socket_path(suffix: &str) -> PathBuf {
    let uid = unsafe { libc::getuid() };
    PathBuf::from(format!("/tmp/validtime-test-{}-{}.sock", uid, suffix))
}

pub fn cleanup_socket(path: &Path) {
    let _ = std::fs::remove_file(path);
}

/// Accepts one connection, checks the request and answers with `response`.
pub fn serve_once(
    path: PathBuf,
    expected: Request,
    response: Response,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let listener = ListenerOptions::new()
            .name(path.as_os_str().to_fs_name::<GenericFilePath>().unwrap())
            .create_tokio()
            .unwrap();

        let mut stream = listener.accept().await.unwrap();

        let request: Request = read_message(&mut stream).await.unwrap();
        assert_eq!(request, expected);

        write_message(&mut stream, &response).await.unwrap();
    })
}
