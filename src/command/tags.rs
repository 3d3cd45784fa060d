use crate::command::{parse_digest, parse_repository, Error};
use argh::FromArgs;
use imagestream_registry::registry::tag_service::TagDescriptor;
use imagestream_registry::registry::Registry;
use tracing::info;

#[derive(FromArgs, PartialEq, Debug)]
#[argh(
    subcommand,
    name = "tags",
    description = "Read and change the tags of an image stream"
)]
pub struct Options {
    #[argh(subcommand)]
    pub action: Action,
}

#[derive(FromArgs, PartialEq, Debug)]
#[argh(subcommand)]
pub enum Action {
    Get(GetOptions),
    List(ListOptions),
    Lookup(LookupOptions),
    Create(CreateOptions),
    Delete(DeleteOptions),
}

#[derive(FromArgs, PartialEq, Debug)]
#[argh(subcommand, name = "get", description = "Resolve a tag to a digest")]
pub struct GetOptions {
    #[argh(positional)]
    /// the image stream, as namespace/name
    pub repository: String,
    #[argh(positional, default = "String::from(\"latest\")")]
    /// the tag to resolve, defaults to `latest`
    pub tag: String,
}

#[derive(FromArgs, PartialEq, Debug)]
#[argh(subcommand, name = "list", description = "List the visible tags")]
pub struct ListOptions {
    #[argh(positional)]
    /// the image stream, as namespace/name
    pub repository: String,
    #[argh(switch, short = 'e')]
    /// show every tag with the reason it is listed or hidden
    pub explain: bool,
}

#[derive(FromArgs, PartialEq, Debug)]
#[argh(
    subcommand,
    name = "lookup",
    description = "List the visible tags pointing at a digest"
)]
pub struct LookupOptions {
    #[argh(positional)]
    /// the image stream, as namespace/name
    pub repository: String,
    #[argh(positional)]
    /// the manifest digest
    pub digest: String,
}

#[derive(FromArgs, PartialEq, Debug)]
#[argh(subcommand, name = "create", description = "Point a tag at an image")]
pub struct CreateOptions {
    #[argh(positional)]
    /// the image stream, as namespace/name
    pub repository: String,
    #[argh(positional)]
    /// the tag to create or move
    pub tag: String,
    #[argh(positional)]
    /// the digest of a stored image
    pub digest: String,
}

#[derive(FromArgs, PartialEq, Debug)]
#[argh(subcommand, name = "delete", description = "Delete a tag")]
pub struct DeleteOptions {
    #[argh(positional)]
    /// the image stream, as namespace/name
    pub repository: String,
    #[argh(positional)]
    /// the tag to delete
    pub tag: String,
}

pub struct Command {
    registry: Registry,
}

impl Command {
    pub fn new(registry: Registry) -> Self {
        Self { registry }
    }

    pub async fn run(&self, options: &Options) -> Result<(), Error> {
        match &options.action {
            Action::Get(options) => {
                let (namespace, name) = parse_repository(&options.repository)?;
                let descriptor = self
                    .registry
                    .tag_service(namespace, name)
                    .get(&options.tag)
                    .await?;
                println!("{}", descriptor.digest);
            }
            Action::List(options) => {
                let (namespace, name) = parse_repository(&options.repository)?;
                let tag_service = self.registry.tag_service(namespace, name);
                if options.explain {
                    for evaluation in tag_service.evaluate_tags(None).await? {
                        println!("{}\t{}", evaluation.tag, evaluation.outcome);
                    }
                } else {
                    for tag in tag_service.all().await? {
                        println!("{tag}");
                    }
                }
            }
            Action::Lookup(options) => {
                let (namespace, name) = parse_repository(&options.repository)?;
                let descriptor = TagDescriptor {
                    digest: parse_digest(&options.digest)?,
                };
                let tags = self
                    .registry
                    .tag_service(namespace, name)
                    .lookup(&descriptor)
                    .await?;
                for tag in tags {
                    println!("{tag}");
                }
            }
            Action::Create(options) => {
                let (namespace, name) = parse_repository(&options.repository)?;
                let descriptor = TagDescriptor {
                    digest: parse_digest(&options.digest)?,
                };
                self.registry
                    .tag_service(namespace, name)
                    .tag(&options.tag, &descriptor)
                    .await?;
                info!(
                    "Tagged {namespace}/{name}:{} as {}",
                    options.tag, descriptor.digest
                );
            }
            Action::Delete(options) => {
                let (namespace, name) = parse_repository(&options.repository)?;
                self.registry
                    .tag_service(namespace, name)
                    .untag(&options.tag)
                    .await?;
                info!("Deleted tag {namespace}/{name}:{}", options.tag);
            }
        }

        Ok(())
    }
}
