use clap::ValueEnum;
use kubeauto_cluster::UserType;

#[derive(Copy, Clone, ValueEnum)]
pub(crate) enum UserTypeFlag {
    Admin,
    View,
}

impl UserTypeFlag {
    pub(crate) const fn as_domain(self) -> UserType {
        match self {
            UserTypeFlag::Admin => UserType::Admin,
            UserTypeFlag::View => UserType::View,
        }
    }
}
